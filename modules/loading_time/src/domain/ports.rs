use async_trait::async_trait;

use super::model::CalculationResult;

/// Handler invoked once a work item's result is available.
///
/// Implementations own their failure handling: nothing they do may leak back
/// into the runner that calls them.
#[async_trait]
pub trait CompletionObserver: Send + Sync {
    async fn on_complete(&self, result: &CalculationResult);
}
