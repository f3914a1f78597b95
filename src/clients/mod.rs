pub mod completion_client;
pub mod dataset_client;

pub use completion_client::{AzureCompletionClient, CompletionClient, Outcome};
pub use dataset_client::{DatasetLoader, HfDatasetClient};
