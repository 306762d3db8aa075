use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Composable image-processing step.
///
/// A `Transform<I, O>` converts an `I` into an `O` and may fail. Steps are
/// chained with `.then(...)`, e.g. loading a file, forcing RGB and warping:
///
/// ```ignore
/// let load = LoadImage::new().then(EnsureRGB);
/// let image = load.apply(path)?;
/// let label = realization.then(ToGrayscale).apply(label)?;
/// ```
///
/// `then()` needs the output of `self` to match the input of `next`, and
/// both steps to be concrete (`Sized`) types.
pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// Two transforms run back to back (`A` -> `B`); `M` is the intermediate type.
#[derive(Debug, Clone, Copy)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {}",
                    short_type_name::<A>(),
                    short_type_name::<B>()
                )
            })
    }
}

/// Last path segment of a type name, with generic arguments kept.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
