use std::sync::Arc;

use clipforge_core::Config;
use clipforge_store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}
