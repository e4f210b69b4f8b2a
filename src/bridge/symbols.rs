//! Internal-call resolution by signature
//!
//! Native lookups go through `il2cpp_resolve_icall`, which walks the
//! runtime's icall table under a lock. Every signature is looked up at most
//! once per process; misses are remembered as well.

use tracing::{debug, warn};

use super::cache::OnceMap;
use crate::backend::SharedNative;
use crate::common::NativeSymbol;
use crate::{Error, Result};

pub struct SymbolResolver {
    native: Option<SharedNative>,
    /// Exact signature -> lookup result
    symbols: OnceMap<String, Option<NativeSymbol>>,
    /// First candidate of a `resolve_any` list -> result for the whole list
    fallbacks: OnceMap<String, Option<NativeSymbol>>,
}

impl SymbolResolver {
    pub fn new(native: Option<SharedNative>) -> Self {
        SymbolResolver {
            native,
            symbols: OnceMap::new(),
            fallbacks: OnceMap::new(),
        }
    }

    /// Resolve one signature, e.g.
    /// `UnityEngine.Transform::get_childCount()`.
    pub fn resolve(&self, signature: &str) -> Result<NativeSymbol> {
        self.cached_lookup(signature)
            .ok_or_else(|| Error::SymbolNotFound {
                signatures: vec![signature.to_string()],
            })
    }

    /// Try each candidate in order; the first one is the cache key for the
    /// whole list.
    ///
    /// Used when an internal call was renamed between Unity versions.
    pub fn resolve_any(&self, signatures: &[&str]) -> Result<NativeSymbol> {
        let not_found = || Error::SymbolNotFound {
            signatures: signatures.iter().map(|s| s.to_string()).collect(),
        };

        let Some(first) = signatures.first() else {
            return Err(not_found());
        };

        self.fallbacks
            .get_or_init(first.to_string(), || {
                signatures.iter().find_map(|sig| self.cached_lookup(sig))
            })
            .ok_or_else(not_found)
    }

    /// Resolve and reinterpret as a function pointer type.
    ///
    /// # Safety
    /// `F` must be an `extern "C"` function pointer type matching the native
    /// signature of every candidate.
    pub unsafe fn resolve_fn<F: Copy>(&self, signatures: &[&str]) -> Result<F> {
        let symbol = self.resolve_any(signatures)?;
        Ok(symbol.cast::<F>())
    }

    /// Number of signatures looked up so far, hits and misses
    pub fn cached(&self) -> usize {
        self.symbols.len()
    }

    fn cached_lookup(&self, signature: &str) -> Option<NativeSymbol> {
        self.symbols
            .get_or_init(signature.to_string(), || self.lookup(signature))
    }

    fn lookup(&self, signature: &str) -> Option<NativeSymbol> {
        let Some(native) = &self.native else {
            debug!("No native runtime, cannot resolve {}", signature);
            return None;
        };

        match native.resolve_symbol(signature).and_then(NativeSymbol::new) {
            Some(symbol) => {
                debug!("Resolved {} -> {}", signature, symbol);
                Some(symbol)
            }
            None => {
                warn!("Internal call not found: {}", signature);
                None
            }
        }
    }
}

#[cfg(all(test, feature = "mono"))]
mod tests {
    use super::*;
    use crate::backend::mock::MockNative;
    use std::sync::Arc;

    fn resolver() -> (Arc<MockNative>, SymbolResolver) {
        let native = Arc::new(MockNative::new());
        native.add_symbol("Foo::Bar", 0x7000);
        native.add_symbol("UnityEngine.Object::GetName(UnityEngine.Object)", 0x7100);
        let resolver = SymbolResolver::new(Some(native.clone() as SharedNative));
        (native, resolver)
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (native, resolver) = resolver();

        let first = resolver.resolve("Foo::Bar").unwrap();
        for _ in 0..10 {
            assert_eq!(resolver.resolve("Foo::Bar").unwrap(), first);
        }
        assert_eq!(first.addr(), 0x7000);
        assert_eq!(native.symbol_lookups(), 1);
    }

    #[test]
    fn test_missing_symbol_is_cached() {
        let (native, resolver) = resolver();

        let err = resolver.resolve("Foo::Missing").unwrap_err();
        assert!(matches!(err, Error::SymbolNotFound { .. }));
        assert!(resolver.resolve("Foo::Missing").is_err());
        assert_eq!(native.symbol_lookups(), 1);
    }

    #[test]
    fn test_resolve_any_tries_candidates_in_order() {
        let (native, resolver) = resolver();
        let candidates = [
            "UnityEngine.Object::GetName()",
            "UnityEngine.Object::GetName(UnityEngine.Object)",
        ];

        let symbol = resolver.resolve_any(&candidates).unwrap();
        assert_eq!(symbol.addr(), 0x7100);
        assert_eq!(native.symbol_lookups(), 2);

        assert_eq!(resolver.resolve_any(&candidates).unwrap(), symbol);
        assert_eq!(
            resolver.resolve("UnityEngine.Object::GetName(UnityEngine.Object)").unwrap(),
            symbol
        );
        assert_eq!(native.symbol_lookups(), 2);
    }

    #[test]
    fn test_resolve_any_lists_every_candidate() {
        let (_, resolver) = resolver();
        let err = resolver.resolve_any(&["A::x()", "A::y()"]).unwrap_err();
        assert_eq!(err.to_string(), "Native symbol not found: A::x() | A::y()");
        assert!(resolver.resolve_any(&[]).is_err());
    }

    #[test]
    fn test_without_native_runtime() {
        let resolver = SymbolResolver::new(None);
        assert!(resolver.resolve("Foo::Bar").is_err());
    }

    #[test]
    fn test_resolve_fn_calls_through() {
        extern "C" fn double(x: i32) -> i32 {
            x * 2
        }

        let native = Arc::new(MockNative::new());
        native.add_symbol("Math::Double(System.Int32)", double as usize);
        let resolver = SymbolResolver::new(Some(native as SharedNative));

        let f: extern "C" fn(i32) -> i32 =
            unsafe { resolver.resolve_fn(&["Math::Double(System.Int32)"]).unwrap() };
        assert_eq!(f(21), 42);
    }
}
