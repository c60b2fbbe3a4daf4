use std::sync::Arc;

use lokey_fortuna::FortunaCore;
use lokey_queue::{FortunaQueue, TrngQueue};
use parking_lot::Mutex;

/// Shared handles the HTTP layer needs: the two queues and the Fortuna
/// core's lock, the same objects the schedulers in `main` drive.
#[derive(Clone)]
pub struct AppState {
    pub trng_queue: Arc<TrngQueue>,
    pub fortuna_queue: Arc<FortunaQueue>,
    pub fortuna_core: Arc<Mutex<FortunaCore>>,
}
