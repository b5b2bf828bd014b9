//! A bound function compiled into a request handler.

use crate::binding::{compile_inputs, compile_outputs, BindError, Bound, Emit, InputBinding, OutputBinding};
use crate::error::{ConfigurationError, RequestError, Unhandled};
use crate::function::handler::{Bind, Failure, FailureKind, Handler, IntoFailure, Invoke, Raised, Returned};
use crate::function::signature::CallShape;
use crate::http::{HttpRequest, HttpResponse, RequestContext, ResponseContext};
use futures::FutureExt;
use hyper::StatusCode;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::debug;

/// Status of every failure response that does not bind its own.
const FAILURE_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// How failures of one error type are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePlan {
    /// `{"error": "<message>"}`.
    Message,
    /// One binding per field of the error structure.
    Structured(Vec<OutputBinding>),
}

impl FailurePlan {
    pub fn compile(kind: FailureKind) -> Result<Self, ConfigurationError> {
        match kind {
            FailureKind::Message => Ok(FailurePlan::Message),
            FailureKind::Structured(fields) => compile_outputs(fields).map(FailurePlan::Structured),
        }
    }

    /// Write a failure response, 400 unless a field binds the status.
    fn respond(&self, failure: Failure) -> Result<HttpResponse, Unhandled> {
        let mut response = ResponseContext::with_status(FAILURE_STATUS);
        match (self, failure) {
            (_, Failure::Message(message)) => {
                response.set_json("error", Value::String(message));
            }
            (FailurePlan::Structured(bindings), Failure::Structured(emits)) => {
                apply(bindings, emits?, &mut response)?;
            }
            (FailurePlan::Message, Failure::Structured(_)) => {
                return Err(BindError::new("error value has no response bindings").into());
            }
        }
        Ok(response.send())
    }
}

/// A function whose signature was validated and whose field tags were
/// compiled once, at registration.
///
/// Immutable after construction and shared by every request routed to it.
pub struct Endpoint {
    invoker: Box<dyn Invoke>,
    inputs: Option<Vec<InputBinding>>,
    outputs: Vec<OutputBinding>,
    failure: FailurePlan,
    rejection: FailurePlan,
}

impl Endpoint {
    /// Validate `handler`'s shape and compile the tags of its input, output
    /// and error structures.
    pub fn new<F, Args>(handler: F) -> Result<Self, ConfigurationError>
    where
        F: Handler<Args>,
        Args: 'static,
    {
        let validated = F::signature().validate()?;
        let inputs = validated.input.map(compile_inputs).transpose()?;

        let (outputs, failure) = match validated.shape {
            CallShape::Nothing => (Vec::new(), FailurePlan::Message),
            CallShape::Output(fields) => (compile_outputs(fields)?, FailurePlan::Message),
            CallShape::Failure(kind) => (Vec::new(), FailurePlan::compile(kind)?),
            CallShape::OutputOrFailure(fields, kind) => {
                (compile_outputs(fields)?, FailurePlan::compile(kind)?)
            }
        };

        Ok(Self {
            invoker: Box::new(Bind::new(handler)),
            inputs,
            outputs,
            failure,
            rejection: FailurePlan::compile(RequestError::kind())?,
        })
    }

    /// Run one request through the bound function.
    ///
    /// Request and function failures are answered here; only panics and
    /// values that cannot be written to the response come back as
    /// [`Unhandled`].
    pub async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, Unhandled> {
        match AssertUnwindSafe(self.process(request)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => recover(payload),
        }
    }

    async fn process(&self, request: HttpRequest) -> Result<HttpResponse, Unhandled> {
        let mut context = RequestContext::new(request);

        let values = match &self.inputs {
            Some(inputs) => match read_inputs(inputs, &mut context) {
                Ok(values) => values,
                Err(err) => return self.reject(err),
            },
            None => Vec::new(),
        };

        let returned = match self.invoker.invoke(values).await {
            Ok(returned) => returned,
            Err(err) => return self.reject(err.into()),
        };

        match returned {
            Returned::Nothing => Ok(ResponseContext::new().send()),
            Returned::Output(emits) => {
                let mut response = ResponseContext::new();
                apply(&self.outputs, emits?, &mut response)?;
                Ok(response.send())
            }
            Returned::Failed(failure) => {
                debug!("Function returned an error");
                self.failure.respond(failure)
            }
        }
    }

    fn reject(&self, err: RequestError) -> Result<HttpResponse, Unhandled> {
        debug!("Rejecting request: {}", err);
        self.rejection.respond(err.into_failure())
    }
}

fn read_inputs(
    inputs: &[InputBinding],
    context: &mut RequestContext,
) -> Result<Vec<Bound>, RequestError> {
    inputs.iter().map(|binding| binding.read(context)).collect()
}

fn apply(
    bindings: &[OutputBinding],
    emits: Vec<Emit>,
    response: &mut ResponseContext,
) -> Result<(), BindError> {
    if bindings.len() != emits.len() {
        return Err(BindError::new(format!(
            "expected {} output values, got {}",
            bindings.len(),
            emits.len()
        )));
    }
    for (binding, emit) in bindings.iter().zip(emits) {
        binding.write(emit, response)?;
    }
    Ok(())
}

/// Turn a caught panic into a response when it carries a structured error.
fn recover(payload: Box<dyn Any + Send>) -> Result<HttpResponse, Unhandled> {
    let payload = match payload.downcast::<Raised>() {
        Ok(raised) => {
            let Raised { kind, failure } = *raised;
            return match (kind, failure) {
                (FailureKind::Structured(fields), failure) if !fields.is_empty() => {
                    match compile_outputs(fields) {
                        Ok(bindings) => FailurePlan::Structured(bindings).respond(failure),
                        Err(err) => Err(Unhandled::Panic(format!("raised error value: {}", err))),
                    }
                }
                (_, Failure::Message(message)) => Err(Unhandled::Panic(message)),
                (_, Failure::Structured(_)) => Err(Unhandled::Panic(
                    "raised error value has no response bindings".to_string(),
                )),
            };
        }
        Err(payload) => payload,
    };

    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "function panicked".to_string()
    };
    Err(Unhandled::Panic(message))
}
