//! Reply handler that turns touch samples into target predictions
//!
//! Requests of the form `{"touch": [f32; TOUCH_FEATURES], "seq": n}` are
//! answered with `{"target": {"x", "y", "radius"}, "seq": n}`. A request
//! carrying a `"quit"` field stops the server. Anything else gets `null`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use switchboard_core::Message;
use switchboard_fabric::Endpoint;

use crate::error::{BoxError, Result};
use crate::reply_server::{serve, Handler, Reply, Stopped, DEFAULT_RECEIVE_TIMEOUT};

/// Length of the feature vector in every touch request
pub const TOUCH_FEATURES: usize = 270;

/// Default port the prediction server binds
pub const DEFAULT_PREDICTION_PORT: u16 = 5556;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Maps one feature vector to a target
pub trait Predictor: Send {
    fn predict(&mut self, features: &[f32]) -> std::result::Result<Target, BoxError>;
}

impl<F> Predictor for F
where
    F: FnMut(&[f32]) -> std::result::Result<Target, BoxError> + Send,
{
    fn predict(&mut self, features: &[f32]) -> std::result::Result<Target, BoxError> {
        self(features)
    }
}

pub struct PredictionHandler<P> {
    predictor: P,
}

impl<P: Predictor> PredictionHandler<P> {
    pub fn new(predictor: P) -> Self {
        Self { predictor }
    }
}

impl<P: Predictor> Handler for PredictionHandler<P> {
    fn handle(&mut self, request: Message) -> std::result::Result<Reply, BoxError> {
        if let Some(touch) = request.get("touch") {
            let features: Vec<f32> = serde_json::from_value(touch.clone())?;
            if features.len() != TOUCH_FEATURES {
                return Err(format!(
                    "expected {} touch features, got {}",
                    TOUCH_FEATURES,
                    features.len()
                )
                .into());
            }

            let seq = request.get("seq").cloned().unwrap_or(Value::Null);
            let target = self.predictor.predict(&features)?;
            tracing::trace!(%seq, ?target, "Prediction served");
            return Ok(Reply::Respond(json!({ "target": target, "seq": seq })));
        }

        if request.get("quit").is_some() {
            return Ok(Reply::Terminate);
        }

        Ok(Reply::Respond(Value::Null))
    }
}

/// Serve predictions on `endpoint` until a quit request arrives
pub async fn prediction_loop<P: Predictor>(predictor: P, endpoint: &Endpoint) -> Result<Stopped> {
    prediction_loop_with_timeout(predictor, endpoint, DEFAULT_RECEIVE_TIMEOUT).await
}

pub async fn prediction_loop_with_timeout<P: Predictor>(
    predictor: P,
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<Stopped> {
    serve(endpoint, PredictionHandler::new(predictor), timeout).await
}
