//! Simulated packet loss.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Draws independent Bernoulli trials deciding whether to drop an incoming
/// request or an outgoing reply. Callbacks are never subject to loss.
#[derive(Debug)]
pub struct LossInjector {
    rng: SmallRng,
    loss_req: f64,
    loss_rep: f64,
}

impl LossInjector {
    pub fn new(loss_req: f64, loss_rep: f64) -> Self {
        Self::with_rng(loss_req, loss_rep, SmallRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn with_rng(loss_req: f64, loss_rep: f64, rng: SmallRng) -> Self {
        Self {
            rng,
            loss_req,
            loss_rep,
        }
    }

    /// True if the just-received request should be dropped.
    pub fn drop_request(&mut self) -> bool {
        self.rng.gen::<f64>() < self.loss_req
    }

    /// True if the outgoing reply should be dropped.
    pub fn drop_reply(&mut self) -> bool {
        self.rng.gen::<f64>() < self.loss_rep
    }
}
