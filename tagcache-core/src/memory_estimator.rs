use std::collections::BTreeMap;
use std::sync::Arc;

/// Estimates how many bytes a cached value occupies.
///
/// [`TagCache`](crate::TagCache) feeds these estimates into the
/// `used-memory` attribute of its [`CacheCounter`](crate::CacheCounter): the
/// estimate is added when a value is stored and subtracted when it leaves the
/// cache, so an implementation must return the same number for an unchanged
/// value.
///
/// The default implementation only accounts for the inline size
/// (`std::mem::size_of_val`). Types owning heap data should add it.
///
/// # Examples
///
/// ```
/// use tagcache_core::MemoryEstimator;
///
/// struct RenderedBlock {
///     xml: String,
///     stylesheet: String,
/// }
///
/// impl MemoryEstimator for RenderedBlock {
///     fn estimate_memory(&self) -> usize {
///         std::mem::size_of::<Self>() + self.xml.capacity() + self.stylesheet.capacity()
///     }
/// }
///
/// let block = RenderedBlock { xml: "<page/>".into(), stylesheet: "page.xsl".into() };
/// assert!(block.estimate_memory() >= std::mem::size_of::<RenderedBlock>() + 15);
/// ```
pub trait MemoryEstimator {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of_val(self)
    }
}

macro_rules! inline_size {
    ($($ty:ty),* $(,)?) => {
        $(impl MemoryEstimator for $ty {})*
    };
}

inline_size!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, ());

impl MemoryEstimator for String {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>() + self.capacity()
    }
}

impl<T: MemoryEstimator> MemoryEstimator for Vec<T> {
    fn estimate_memory(&self) -> usize {
        // Spare capacity counts at its inline size.
        let spare = (self.capacity() - self.len()) * std::mem::size_of::<T>();
        std::mem::size_of::<Self>()
            + spare
            + self.iter().map(MemoryEstimator::estimate_memory).sum::<usize>()
    }
}

impl<T: MemoryEstimator> MemoryEstimator for Option<T> {
    fn estimate_memory(&self) -> usize {
        match self {
            // The payload's inline size is already part of the option.
            Some(value) => {
                std::mem::size_of::<Self>()
                    + value
                        .estimate_memory()
                        .saturating_sub(std::mem::size_of::<T>())
            }
            None => std::mem::size_of::<Self>(),
        }
    }
}

impl<T: MemoryEstimator + ?Sized> MemoryEstimator for Box<T> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>() + (**self).estimate_memory()
    }
}

/// Shared values are counted in full by every cache holding them.
impl<T: MemoryEstimator + ?Sized> MemoryEstimator for Arc<T> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>() + (**self).estimate_memory()
    }
}

impl MemoryEstimator for str {
    fn estimate_memory(&self) -> usize {
        self.len()
    }
}

impl<K: MemoryEstimator, V: MemoryEstimator> MemoryEstimator for BTreeMap<K, V> {
    fn estimate_memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .iter()
                .map(|(k, v)| k.estimate_memory() + v.estimate_memory())
                .sum::<usize>()
    }
}
