//! In-process access to the IL2CPP runtime through its exported C API

use std::ffi::{c_char, c_void, CStr, CString};

use libloading::Library;
use tracing::{debug, info};

use super::injection::InjectionRegistry;
use crate::backend::{BackendError, NativeRuntime};
use crate::common::{ClassHandle, NativePtr, TypeName};
use crate::config::BridgeConfig;
use crate::object::ObjectHandle;
use crate::type_definition::TypeRef;

type ResolveIcallFn = unsafe extern "C" fn(*const c_char) -> *const c_void;
type ObjectGetClassFn = unsafe extern "C" fn(*mut c_void) -> *mut c_void;
type ClassIsAssignableFromFn = unsafe extern "C" fn(*mut c_void, *mut c_void) -> bool;
type ClassGetStringFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type DomainGetFn = unsafe extern "C" fn() -> *mut c_void;
type DomainGetAssembliesFn = unsafe extern "C" fn(*mut c_void, *mut usize) -> *const *mut c_void;
type AssemblyGetImageFn = unsafe extern "C" fn(*mut c_void) -> *const c_void;
type ClassFromNameFn = unsafe extern "C" fn(*const c_void, *const c_char, *const c_char) -> *mut c_void;

#[derive(Clone, Copy)]
struct Il2CppExports {
    resolve_icall: ResolveIcallFn,
    object_get_class: ObjectGetClassFn,
    class_is_assignable_from: ClassIsAssignableFromFn,
    class_get_name: ClassGetStringFn,
    class_get_namespace: ClassGetStringFn,
    domain_get: DomainGetFn,
    domain_get_assemblies: DomainGetAssembliesFn,
    assembly_get_image: AssemblyGetImageFn,
    class_from_name: ClassFromNameFn,
}

/// Native runtime accessor for an IL2CPP game
pub struct Il2CppApi {
    exports: Il2CppExports,
    injection: InjectionRegistry,
    // Keeps the exports above valid; dropped last
    _library: Library,
}

impl Il2CppApi {
    /// Bind the runtime exports of the already loaded IL2CPP library.
    pub fn load(config: &BridgeConfig) -> Result<Self, BackendError> {
        let library = unsafe { Library::new(&config.native_library) }
            .map_err(|e| BackendError::LibraryNotLoaded(format!("{}: {}", config.native_library, e)))?;

        let exports = Il2CppExports {
            resolve_icall: export(&library, "il2cpp_resolve_icall")?,
            object_get_class: export(&library, "il2cpp_object_get_class")?,
            class_is_assignable_from: export(&library, "il2cpp_class_is_assignable_from")?,
            class_get_name: export(&library, "il2cpp_class_get_name")?,
            class_get_namespace: export(&library, "il2cpp_class_get_namespace")?,
            domain_get: export(&library, "il2cpp_domain_get")?,
            domain_get_assemblies: export(&library, "il2cpp_domain_get_assemblies")?,
            assembly_get_image: export(&library, "il2cpp_assembly_get_image")?,
            class_from_name: export(&library, "il2cpp_class_from_name")?,
        };

        info!("Bound IL2CPP exports from {}", config.native_library);
        Ok(Il2CppApi {
            exports,
            injection: InjectionRegistry::new(),
            _library: library,
        })
    }

    /// Classes injected by plugins and their attached managed objects
    pub fn injection(&self) -> &InjectionRegistry {
        &self.injection
    }

    fn class_string(&self, get: ClassGetStringFn, class: ClassHandle) -> Option<String> {
        let ptr = unsafe { get(class.as_ptr()) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

fn export<T: Copy>(library: &Library, name: &str) -> Result<T, BackendError> {
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|e| BackendError::ExportMissing(format!("{}: {}", name, e)))
}

impl NativeRuntime for Il2CppApi {
    fn runtime_name(&self) -> &'static str {
        "IL2CPP"
    }

    fn resolve_symbol(&self, signature: &str) -> Option<usize> {
        let signature = CString::new(signature).ok()?;
        let ptr = unsafe { (self.exports.resolve_icall)(signature.as_ptr()) };
        if ptr.is_null() {
            None
        } else {
            Some(ptr as usize)
        }
    }

    fn class_of(&self, instance: NativePtr) -> Option<ClassHandle> {
        let class = unsafe { (self.exports.object_get_class)(instance.as_ptr()) };
        ClassHandle::from_raw(class)
    }

    fn is_assignable_from(&self, target: ClassHandle, source: ClassHandle) -> bool {
        unsafe { (self.exports.class_is_assignable_from)(target.as_ptr(), source.as_ptr()) }
    }

    fn injected_wrapper(&self, instance: NativePtr) -> Option<ObjectHandle> {
        self.injection.wrapper_for(instance)
    }

    fn injected_type(&self, class: ClassHandle) -> Option<TypeRef> {
        self.injection.type_for(class)
    }

    fn class_name(&self, class: ClassHandle) -> Option<TypeName> {
        let name = self.class_string(self.exports.class_get_name, class)?;
        let namespace = self
            .class_string(self.exports.class_get_namespace, class)
            .unwrap_or_default();
        Some(TypeName::new(namespace, name))
    }

    fn class_from_name(&self, name: &TypeName) -> Option<ClassHandle> {
        let namespace = CString::new(name.namespace.as_str()).ok()?;
        let class_name = CString::new(name.name.as_str()).ok()?;

        unsafe {
            let domain = (self.exports.domain_get)();
            if domain.is_null() {
                return None;
            }

            let mut count = 0usize;
            let assemblies = (self.exports.domain_get_assemblies)(domain, &mut count);
            if assemblies.is_null() {
                return None;
            }

            for &assembly in std::slice::from_raw_parts(assemblies, count) {
                let image = (self.exports.assembly_get_image)(assembly);
                if image.is_null() {
                    continue;
                }
                let class = (self.exports.class_from_name)(image, namespace.as_ptr(), class_name.as_ptr());
                if let Some(class) = ClassHandle::from_raw(class) {
                    return Some(class);
                }
            }
        }

        debug!("No native class named {}", name);
        None
    }
}
