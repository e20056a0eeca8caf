//! Stable 32-bit type identity for map keys and diagnostics.
//!
//! [`TypeKey`] hashes a type's name with FNV-1a down to a `u32` that is cheap
//! to store and compare, and keeps the name alongside for error messages.
//! 32 bits is plenty for the small closed set of types a program actually
//! registers; a collision inside that set is a bug, not a runtime condition
//! to recover from.

use std::any::type_name;

const FNV_BASIS_32: u32 = 0x811C_9DC5;
const FNV_PRIME_32: u32 = 0x0100_0193;

/// FNV-1a over the bytes of `input`, usable in const context.
pub const fn fnv1a_32(input: &str) -> u32 {
    let bytes = input.as_bytes();
    let mut hash = FNV_BASIS_32;
    let mut i = 0;
    while i < bytes.len() {
        hash = (hash ^ bytes[i] as u32).wrapping_mul(FNV_PRIME_32);
        i += 1;
    }
    hash
}

/// Identity of a Rust type: a 32-bit name hash plus the name itself.
///
/// Keys are always taken from owned types (`TypeKey::of::<Widget>()`, never
/// `&Widget`), so one type has exactly one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    hash: u32,
    name: &'static str,
}

impl TypeKey {
    /// The key identifying `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = type_name::<T>();
        Self {
            hash: fnv1a_32(name),
            name,
        }
    }

    /// Reserved key meaning "no particular type".
    pub fn untyped() -> Self {
        Self::of::<()>()
    }

    /// The 32-bit hash, used as the map key.
    pub const fn hash(&self) -> u32 {
        self.hash
    }

    /// Human-readable type name, for diagnostics only.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(""), 0x811C_9DC5);
        assert_eq!(fnv1a_32("a"), 0xE40C_292C);
        assert_eq!(fnv1a_32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn same_type_same_key() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
    }

    #[test]
    fn distinct_types_distinct_hashes() {
        assert_ne!(TypeKey::of::<u32>().hash(), TypeKey::of::<u64>().hash());
        assert_ne!(
            TypeKey::of::<String>().hash(),
            TypeKey::of::<Vec<String>>().hash()
        );
    }

    #[test]
    fn name_is_readable() {
        assert!(TypeKey::of::<String>().name().contains("String"));
    }

    #[test]
    fn untyped_is_unit() {
        assert_eq!(TypeKey::untyped(), TypeKey::of::<()>());
    }
}
