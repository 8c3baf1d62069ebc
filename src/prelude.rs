//! Shared imports and collection aliases.
//!
//! The rest of the crate pulls its `Rc`/`RefCell`/map types from here so the
//! hashing strategy is decided in exactly one place.

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

pub use std::{
    cell::{Cell, OnceCell, Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

// ═══════════════════════════════════════════════════════════════════════════════
// Hash maps - FxHasher everywhere
// ═══════════════════════════════════════════════════════════════════════════════

pub use rustc_hash::{FxHashMap, FxHashSet};

pub type IndexMap<K, V> =
    indexmap::IndexMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Create an empty IndexMap
#[inline]
pub fn index_map_new<K, V>() -> IndexMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    indexmap::IndexMap::with_hasher(Default::default())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Math functions (libm, identical results on every target)
// ═══════════════════════════════════════════════════════════════════════════════

pub mod math {
    #[inline]
    pub fn floor(x: f64) -> f64 {
        libm::floor(x)
    }

    #[inline]
    pub fn ceil(x: f64) -> f64 {
        libm::ceil(x)
    }

    /// JavaScript rounding: halves round towards +Infinity.
    #[inline]
    pub fn round(x: f64) -> f64 {
        libm::floor(x + 0.5)
    }

    #[inline]
    pub fn trunc(x: f64) -> f64 {
        libm::trunc(x)
    }

    #[inline]
    pub fn powf(base: f64, exp: f64) -> f64 {
        // 1 ** NaN and (-1) ** ±Infinity are NaN in JavaScript, libm says 1
        if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
            return f64::NAN;
        }
        libm::pow(base, exp)
    }

    #[inline]
    pub fn fmod(x: f64, y: f64) -> f64 {
        libm::fmod(x, y)
    }

    #[inline]
    pub fn sqrt(x: f64) -> f64 {
        libm::sqrt(x)
    }

    #[inline]
    pub fn cbrt(x: f64) -> f64 {
        libm::cbrt(x)
    }

    #[inline]
    pub fn exp(x: f64) -> f64 {
        libm::exp(x)
    }

    #[inline]
    pub fn log(x: f64) -> f64 {
        libm::log(x)
    }

    #[inline]
    pub fn log2(x: f64) -> f64 {
        libm::log2(x)
    }

    #[inline]
    pub fn log10(x: f64) -> f64 {
        libm::log10(x)
    }

    #[inline]
    pub fn sin(x: f64) -> f64 {
        libm::sin(x)
    }

    #[inline]
    pub fn cos(x: f64) -> f64 {
        libm::cos(x)
    }

    #[inline]
    pub fn tan(x: f64) -> f64 {
        libm::tan(x)
    }

    #[inline]
    pub fn atan(x: f64) -> f64 {
        libm::atan(x)
    }

    #[inline]
    pub fn atan2(y: f64, x: f64) -> f64 {
        libm::atan2(y, x)
    }

    #[inline]
    pub fn hypot(x: f64, y: f64) -> f64 {
        libm::hypot(x, y)
    }
}
