//! Runtime detection for Mono vs IL2CPP
//!
//! The bridge runs inside the game process, so detection only has to look at
//! what this process has loaded.

use tracing::{debug, info};

use super::{BackendError, SharedNative};
use crate::config::BridgeConfig;

/// Name of the IL2CPP library on different platforms
#[cfg(target_os = "windows")]
pub const IL2CPP_LIBRARY: &str = "GameAssembly.dll";

#[cfg(target_os = "macos")]
pub const IL2CPP_LIBRARY: &str = "GameAssembly.dylib";

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const IL2CPP_LIBRARY: &str = "GameAssembly.so";

/// Name of the Mono library on different platforms
#[cfg(target_os = "windows")]
pub const MONO_LIBRARY: &str = "mono-2.0-bdwgc.dll";

#[cfg(target_os = "macos")]
pub const MONO_LIBRARY: &str = "libmonobdwgc-2.0.dylib";

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const MONO_LIBRARY: &str = "libmonobdwgc-2.0.so";

/// The type of Unity runtime detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Mono runtime: managed reflection only, no native side
    Mono,
    /// IL2CPP runtime: managed wrappers over native classes
    Il2Cpp,
    /// Could not determine runtime type
    Unknown,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Mono => write!(f, "Mono"),
            RuntimeType::Il2Cpp => write!(f, "IL2CPP"),
            RuntimeType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classify a list of loaded module paths (one per line, `/proc/self/maps`
/// format or plain paths).
///
/// IL2CPP wins when both are present: IL2CPP games still ship a Mono
/// runtime for the mod loader.
pub fn classify_loaded_modules(maps: &str, native_library: &str) -> RuntimeType {
    if maps.lines().any(|line| line.contains(native_library)) {
        return RuntimeType::Il2Cpp;
    }

    if maps
        .lines()
        .any(|line| line.contains("libmono") || line.contains("mono-2.0"))
    {
        return RuntimeType::Mono;
    }

    RuntimeType::Unknown
}

/// Detect the runtime of the current process
///
/// Detection strategy:
/// - Linux: scan /proc/self/maps for GameAssembly.so or libmono*.so
/// - macOS: ask the loader whether the library is mapped (`RTLD_NOLOAD`)
/// - Windows: `GetModuleHandleA`, which never loads anything
pub fn detect_runtime(config: &BridgeConfig) -> RuntimeType {
    #[cfg(target_os = "linux")]
    {
        detect_runtime_linux(config)
    }

    #[cfg(not(target_os = "linux"))]
    {
        if is_module_loaded(&config.native_library) {
            RuntimeType::Il2Cpp
        } else if is_module_loaded(MONO_LIBRARY) {
            RuntimeType::Mono
        } else {
            RuntimeType::Unknown
        }
    }
}

#[cfg(target_os = "linux")]
fn detect_runtime_linux(config: &BridgeConfig) -> RuntimeType {
    match std::fs::read_to_string("/proc/self/maps") {
        Ok(maps) => classify_loaded_modules(&maps, &config.native_library),
        Err(e) => {
            debug!("Failed to read /proc/self/maps: {}", e);
            RuntimeType::Unknown
        }
    }
}

#[cfg(target_os = "macos")]
fn is_module_loaded(name: &str) -> bool {
    let Ok(name) = std::ffi::CString::new(name) else {
        return false;
    };

    unsafe {
        let handle = libc::dlopen(name.as_ptr(), libc::RTLD_NOLOAD | libc::RTLD_LAZY);
        if handle.is_null() {
            return false;
        }
        libc::dlclose(handle);
    }
    true
}

#[cfg(target_os = "windows")]
fn is_module_loaded(name: &str) -> bool {
    use winapi::um::libloaderapi::GetModuleHandleA;

    let Ok(name) = std::ffi::CString::new(name) else {
        return false;
    };
    !unsafe { GetModuleHandleA(name.as_ptr()) }.is_null()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn is_module_loaded(_name: &str) -> bool {
    false
}

/// Create the native accessor for the current process.
///
/// Mono processes have no native side: `Ok(None)` puts the bridge in its
/// managed-only mode.
pub fn create_native_runtime(config: &BridgeConfig) -> Result<Option<SharedNative>, BackendError> {
    let runtime = detect_runtime(config);
    info!("Detected {} runtime", runtime);

    match runtime {
        RuntimeType::Mono => Ok(None),
        RuntimeType::Il2Cpp => {
            #[cfg(feature = "il2cpp")]
            {
                let api = crate::il2cpp::Il2CppApi::load(config)?;
                Ok(Some(std::sync::Arc::new(api)))
            }
            #[cfg(not(feature = "il2cpp"))]
            {
                Err(BackendError::Other("IL2CPP backend not enabled".to_string()))
            }
        }
        RuntimeType::Unknown => Err(BackendError::InitializationFailed(
            "Could not detect runtime type (Mono or IL2CPP)".to_string(),
        )),
    }
}
