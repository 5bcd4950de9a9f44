//! Text transforms
//!
//! A transform turns the text of one run into its replacement. It only ever
//! sees the string, never the document tree, so independent calls may run
//! concurrently.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;

/// Turns the text of one run into its replacement
#[async_trait]
pub trait TextTransform: Send + Sync {
    async fn transform(&self, text: &str) -> Result<String, BoxError>;
}

#[async_trait]
impl<T: TextTransform + ?Sized> TextTransform for Box<T> {
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        (**self).transform(text).await
    }
}

#[async_trait]
impl<T: TextTransform + ?Sized> TextTransform for Arc<T> {
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        (**self).transform(text).await
    }
}

/// Turns the texts of many runs into their replacements in one call
///
/// The result must hold exactly one text per input, in input order.
#[async_trait]
pub trait BatchTransform: Send + Sync {
    async fn transform_batch(&self, texts: &[String]) -> Result<Vec<String>, BoxError>;
}

#[async_trait]
impl<T: BatchTransform + ?Sized> BatchTransform for Box<T> {
    async fn transform_batch(&self, texts: &[String]) -> Result<Vec<String>, BoxError> {
        (**self).transform_batch(texts).await
    }
}

#[async_trait]
impl<T: BatchTransform + ?Sized> BatchTransform for Arc<T> {
    async fn transform_batch(&self, texts: &[String]) -> Result<Vec<String>, BoxError> {
        (**self).transform_batch(texts).await
    }
}

/// Wraps a closure taking all texts and returning a future of their replacements
pub struct BatchFnTransform<F>(pub F);

#[async_trait]
impl<F, Fut, E> BatchTransform for BatchFnTransform<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<String>, E>> + Send,
    E: Into<BoxError>,
{
    async fn transform_batch(&self, texts: &[String]) -> Result<Vec<String>, BoxError> {
        (self.0)(texts.to_vec()).await.map_err(Into::into)
    }
}

/// Returns every text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

#[async_trait]
impl TextTransform for IdentityTransform {
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        Ok(text.to_string())
    }
}

/// Upper-cases every text
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseTransform;

#[async_trait]
impl TextTransform for UppercaseTransform {
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        Ok(text.to_uppercase())
    }
}

/// Wraps a synchronous closure
///
/// ```
/// use lingodok_translate::{FnTransform, TextTransform};
///
/// let shout = FnTransform(|text: &str| Ok::<_, std::convert::Infallible>(format!("{text}!")));
/// # tokio_test_block(async move {
/// assert_eq!(shout.transform("hi").await.unwrap(), "hi!");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct FnTransform<F>(pub F);

#[async_trait]
impl<F, E> TextTransform for FnTransform<F>
where
    F: Fn(&str) -> Result<String, E> + Send + Sync,
    E: Into<BoxError>,
{
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        (self.0)(text).map_err(Into::into)
    }
}

/// Wraps a closure returning a future
pub struct AsyncFnTransform<F>(pub F);

#[async_trait]
impl<F, Fut, E> TextTransform for AsyncFnTransform<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, E>> + Send,
    E: Into<BoxError>,
{
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        (self.0)(text.to_string()).await.map_err(Into::into)
    }
}

/// Literal term replacement from a glossary
///
/// At each position the longest matching term wins; replaced output is
/// never matched again.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTransform {
    terms: Vec<(String, String)>,
}

impl GlossaryTransform {
    pub fn new(glossary: &BTreeMap<String, String>) -> Self {
        let mut terms: Vec<(String, String)> = glossary
            .iter()
            .filter(|(term, _)| !term.is_empty())
            .map(|(term, replacement)| (term.clone(), replacement.clone()))
            .collect();
        terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { terms }
    }

    /// Number of glossary terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Apply the glossary to a string
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            match self.terms.iter().find(|(term, _)| rest.starts_with(term.as_str())) {
                Some((term, replacement)) => {
                    out.push_str(replacement);
                    rest = &rest[term.len()..];
                }
                None => {
                    out.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        out
    }
}

#[async_trait]
impl TextTransform for GlossaryTransform {
    async fn transform(&self, text: &str) -> Result<String, BoxError> {
        Ok(self.apply(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glossary(pairs: &[(&str, &str)]) -> GlossaryTransform {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GlossaryTransform::new(&map)
    }

    #[tokio::test]
    async fn test_builtin_transforms() {
        assert_eq!(IdentityTransform.transform(" a b ").await.unwrap(), " a b ");
        assert_eq!(UppercaseTransform.transform("straße").await.unwrap(), "STRASSE");
    }

    #[tokio::test]
    async fn test_closure_transforms() {
        let sync = FnTransform(|text: &str| {
            if text.is_empty() {
                Err("empty")
            } else {
                Ok(text.chars().rev().collect::<String>())
            }
        });
        assert_eq!(sync.transform("abc").await.unwrap(), "cba");
        assert_eq!(sync.transform("").await.unwrap_err().to_string(), "empty");

        let asynchronous = AsyncFnTransform(|text: String| async move {
            Ok::<_, BoxError>(format!("[{text}]"))
        });
        assert_eq!(asynchronous.transform("x").await.unwrap(), "[x]");
    }

    #[tokio::test]
    async fn test_boxed_transform() {
        let boxed: Box<dyn TextTransform> = Box::new(UppercaseTransform);
        assert_eq!(boxed.transform("ok").await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_batch_closure_transform() {
        let batch = BatchFnTransform(|texts: Vec<String>| async move {
            Ok::<_, BoxError>(texts.iter().map(|t| t.to_uppercase()).collect())
        });
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(batch.transform_batch(&texts).await.unwrap(), vec!["A", "B"]);

        let boxed: Box<dyn BatchTransform> = Box::new(batch);
        assert_eq!(boxed.transform_batch(&[]).await.unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_glossary_longest_match_first() {
        let g = glossary(&[("New", "Neu"), ("New York", "New York City"), ("", "never")]);
        assert_eq!(g.len(), 2);
        assert_eq!(g.apply("New York and New Jersey"), "New York City and Neu Jersey");
    }

    #[test]
    fn test_glossary_does_not_rescan_output() {
        let g = glossary(&[("a", "aa")]);
        assert_eq!(g.apply("banana"), "baanaanaa");
        assert_eq!(glossary(&[("é", "e")]).apply("café"), "cafe");
    }
}
