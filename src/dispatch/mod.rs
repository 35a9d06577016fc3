//! Classification dispatch: clip upload, relevance filtering, and
//! verdict publication.

pub mod classifier;
pub mod session;
pub mod sink;
pub mod verdict;

pub use classifier::{Classifier, HttpClassifier};
pub use session::{MemorySession, SessionStore};
pub use sink::{ChannelSink, CollectorSink, StdoutSink, VerdictSink};
pub use verdict::{AlertCategory, Verdict};

use crate::detect::recorder::Clip;
use crate::error::Result;
use std::sync::Arc;

/// Drives one clip through classification and publication.
///
/// Upload errors propagate to the caller; filtered-out verdicts are
/// dropped silently. A clip is handed in exactly once and never retried.
pub struct Dispatcher {
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn VerdictSink>,
}

impl Dispatcher {
    pub fn new(classifier: Arc<dyn Classifier>, sink: Arc<dyn VerdictSink>) -> Self {
        Self { classifier, sink }
    }

    /// Classifies the clip and publishes the verdict if relevant.
    ///
    /// Returns the verdict when it was published, `None` when the filter
    /// discarded it.
    pub async fn dispatch(&self, clip: &Clip) -> Result<Option<Verdict>> {
        let verdict = self.classifier.classify(clip).await?;
        if verdict.is_relevant() {
            self.sink.publish(&verdict);
            Ok(Some(verdict))
        } else {
            Ok(None)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{test_clip, verdict, MockClassifier};
    use super::*;
    use crate::error::AurisError;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_relevant_verdict_is_published() {
        let classifier = Arc::new(MockClassifier::returning(vec![Ok(verdict("Siren"))]));
        let sink = CollectorSink::new();
        let dispatcher = Dispatcher::new(classifier, Arc::new(sink.clone()));

        let result = runtime().block_on(dispatcher.dispatch(&test_clip())).unwrap();

        assert!(result.is_some());
        assert_eq!(sink.collected().len(), 1);
        assert_eq!(sink.collected()[0].sound_type, "Siren");
    }

    #[test]
    fn test_silence_verdict_is_dropped() {
        let classifier = Arc::new(MockClassifier::returning(vec![Ok(verdict("Silence"))]));
        let sink = CollectorSink::new();
        let dispatcher = Dispatcher::new(classifier, Arc::new(sink.clone()));

        let result = runtime().block_on(dispatcher.dispatch(&test_clip())).unwrap();

        assert!(result.is_none());
        assert!(sink.collected().is_empty());
    }

    #[test]
    fn test_upload_failure_propagates_without_publishing() {
        let classifier = Arc::new(MockClassifier::returning(vec![Err(AurisError::Upload {
            message: "connection refused".to_string(),
        })]));
        let sink = CollectorSink::new();
        let dispatcher = Dispatcher::new(classifier, Arc::new(sink.clone()));

        let result = runtime().block_on(dispatcher.dispatch(&test_clip()));

        assert!(result.is_err());
        assert!(sink.collected().is_empty());
    }
}
