//! Schema traits for bound functions and the erased call interface.
//!
//! Input, output and error types describe themselves through these traits,
//! normally generated with `#[derive(Input)]`, `#[derive(Output)]` and
//! `#[derive(IntoFailure)]`. A [`Handler`] combines them into a
//! [`Signature`] that is validated once, when the endpoint is built.

use crate::binding::{BindError, Bound, Emit, FieldSchema};
use crate::function::signature::{Signature, Slot};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

/// A type accepted as the parameter of a bound function.
pub trait Input: Sized + Send + 'static {
    /// How the type is declared as a parameter.
    fn slot() -> Slot;

    /// Build the value from one raw value per declared field, in declaration
    /// order.
    fn assemble(values: Vec<Bound>) -> Result<Self, BindError>;
}

/// A structure whose fields are written to response channels.
pub trait Output: Send + 'static {
    const FIELDS: &'static [FieldSchema];

    /// One wire value per declared field, in declaration order.
    fn into_emits(self) -> Result<Vec<Emit>, BindError>;
}

/// How an error type is written to the response, decided at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Flattened to `{"error": "<message>"}`.
    Message,
    /// Bound field by field, like an output.
    Structured(&'static [FieldSchema]),
}

/// A returned error value, ready to be written.
#[derive(Debug)]
pub enum Failure {
    Message(String),
    Structured(Result<Vec<Emit>, BindError>),
}

/// An error-capable type.
pub trait IntoFailure: Send + 'static {
    fn kind() -> FailureKind;

    fn into_failure(self) -> Failure;
}

/// The classified result of one call.
#[derive(Debug)]
pub enum Returned {
    /// Nothing to write beyond the defaults.
    Nothing,
    Output(Result<Vec<Emit>, BindError>),
    Failed(Failure),
}

/// A type accepted as the return value of a bound function.
pub trait Returns: Send + 'static {
    /// The declared return values, in order.
    fn slots() -> Vec<Slot>;

    fn into_returned(self) -> Returned;
}

impl Returns for () {
    fn slots() -> Vec<Slot> {
        Vec::new()
    }

    fn into_returned(self) -> Returned {
        Returned::Nothing
    }
}

impl<E: IntoFailure> Returns for Result<(), E> {
    fn slots() -> Vec<Slot> {
        vec![Slot::Error(E::kind())]
    }

    fn into_returned(self) -> Returned {
        match self {
            Ok(()) => Returned::Nothing,
            Err(err) => Returned::Failed(err.into_failure()),
        }
    }
}

impl<O: Output, E: IntoFailure> Returns for Result<O, E> {
    fn slots() -> Vec<Slot> {
        vec![Slot::Structured(O::FIELDS), Slot::Error(E::kind())]
    }

    fn into_returned(self) -> Returned {
        match self {
            Ok(output) => Returned::Output(output.into_emits()),
            Err(err) => Returned::Failed(err.into_failure()),
        }
    }
}

// Plain values type-check as parameters and returns so that the validator,
// not the compiler, reports them as an invalid interface.
macro_rules! opaque {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Input for $ty {
                fn slot() -> Slot {
                    Slot::Opaque(stringify!($ty))
                }

                fn assemble(_values: Vec<Bound>) -> Result<Self, BindError> {
                    Err(BindError::new(concat!(stringify!($ty), " is not a request structure")))
                }
            }

            impl Returns for $ty {
                fn slots() -> Vec<Slot> {
                    vec![Slot::Opaque(stringify!($ty))]
                }

                fn into_returned(self) -> Returned {
                    Returned::Nothing
                }
            }
        )*
    };
}

opaque!(
    String, &'static str, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
    Bytes, Value,
);

impl IntoFailure for String {
    fn kind() -> FailureKind {
        FailureKind::Message
    }

    fn into_failure(self) -> Failure {
        Failure::Message(self)
    }
}

impl IntoFailure for &'static str {
    fn kind() -> FailureKind {
        FailureKind::Message
    }

    fn into_failure(self) -> Failure {
        Failure::Message(self.to_string())
    }
}

impl IntoFailure for Box<dyn std::error::Error + Send + Sync> {
    fn kind() -> FailureKind {
        FailureKind::Message
    }

    fn into_failure(self) -> Failure {
        Failure::Message(self.to_string())
    }
}

impl IntoFailure for std::io::Error {
    fn kind() -> FailureKind {
        FailureKind::Message
    }

    fn into_failure(self) -> Failure {
        Failure::Message(self.to_string())
    }
}

impl IntoFailure for serde_json::Error {
    fn kind() -> FailureKind {
        FailureKind::Message
    }

    fn into_failure(self) -> Failure {
        Failure::Message(self.to_string())
    }
}

/// Panic payload carrying an error value out of a bound function.
pub(crate) struct Raised {
    pub(crate) kind: FailureKind,
    pub(crate) failure: Failure,
}

/// Abort the running bound function with an error value.
///
/// When the value's type carries response tags, the endpoint answers with it
/// exactly as if the function had returned it. Any other value reaches the
/// route table as an unhandled failure.
///
/// The value unwinds through [`std::panic::panic_any`], so the installed
/// panic hook still runs. The default hook prints a "panicked at" line to
/// stderr for every raise. Applications that raise on hot paths can install
/// their own hook with [`std::panic::set_hook`] that stays quiet for payloads
/// which are not `&str` or `String`.
pub fn raise<E: IntoFailure>(error: E) -> ! {
    std::panic::panic_any(Raised {
        kind: E::kind(),
        failure: error.into_failure(),
    })
}

/// An async function of an admissible shape.
///
/// Implemented for `async` functions and closures taking no argument or one
/// [`Input`], and returning a [`Returns`] type. `Args` only disambiguates the
/// two arities.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    fn signature() -> Signature;

    /// Assemble the input from raw field values and call the function.
    fn call(&self, values: Vec<Bound>) -> BoxFuture<'static, Result<Returned, BindError>>;
}

impl<F, Fut, R> Handler<()> for F
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Returns,
{
    fn signature() -> Signature {
        Signature {
            input: None,
            returns: R::slots(),
        }
    }

    fn call(&self, _values: Vec<Bound>) -> BoxFuture<'static, Result<Returned, BindError>> {
        let call = self();
        Box::pin(async move { Ok(call.await.into_returned()) })
    }
}

impl<F, Fut, I, R> Handler<(I,)> for F
where
    F: Fn(I) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    I: Input,
    R: Returns,
{
    fn signature() -> Signature {
        Signature {
            input: Some(I::slot()),
            returns: R::slots(),
        }
    }

    fn call(&self, values: Vec<Bound>) -> BoxFuture<'static, Result<Returned, BindError>> {
        match I::assemble(values) {
            Ok(input) => {
                let call = self(input);
                Box::pin(async move { Ok(call.await.into_returned()) })
            }
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }
}

/// Object-safe view of a [`Handler`], stored by the endpoint.
#[async_trait]
pub(crate) trait Invoke: Send + Sync {
    async fn invoke(&self, values: Vec<Bound>) -> Result<Returned, BindError>;
}

pub(crate) struct Bind<F, Args> {
    handler: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> Bind<F, Args> {
    pub(crate) fn new(handler: F) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Args> Invoke for Bind<F, Args>
where
    F: Handler<Args>,
    Args: 'static,
{
    async fn invoke(&self, values: Vec<Bound>) -> Result<Returned, BindError> {
        self.handler.call(values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting {
        name: String,
    }

    impl Input for Greeting {
        fn slot() -> Slot {
            const FIELDS: &[FieldSchema] = &[FieldSchema::new("name", Some("json,name"))];
            Slot::Structured(FIELDS)
        }

        fn assemble(values: Vec<Bound>) -> Result<Self, BindError> {
            let mut values = values.into_iter();
            Ok(Self {
                name: crate::binding::next_field(&mut values, "name")?,
            })
        }
    }

    struct Reply {
        message: String,
    }

    impl Output for Reply {
        const FIELDS: &'static [FieldSchema] = &[FieldSchema::new("message", Some("json,message"))];

        fn into_emits(self) -> Result<Vec<Emit>, BindError> {
            Ok(vec![crate::binding::emit_field(self.message, "message")?])
        }
    }

    fn signature_of<Args, H: Handler<Args>>(_handler: H) -> Signature {
        H::signature()
    }

    async fn greet(input: Greeting) -> Result<Reply, String> {
        if input.name.is_empty() {
            return Err("name is required".to_string());
        }
        Ok(Reply {
            message: format!("hello {}", input.name),
        })
    }

    async fn ping() {}

    async fn check(_input: Greeting) -> Result<(), std::io::Error> {
        Ok(())
    }

    async fn echo(text: String) -> String {
        text
    }

    #[test]
    fn test_signatures_of_admissible_functions() {
        let signature = signature_of(greet);
        assert!(matches!(signature.input, Some(Slot::Structured(_))));
        assert_eq!(
            signature.returns,
            vec![Slot::Structured(Reply::FIELDS), Slot::Error(FailureKind::Message)]
        );

        let signature = signature_of(ping);
        assert_eq!(signature, Signature { input: None, returns: vec![] });

        let signature = signature_of(check);
        assert_eq!(signature.returns, vec![Slot::Error(FailureKind::Message)]);
    }

    #[test]
    fn test_plain_values_are_opaque() {
        let signature = signature_of(echo);
        assert_eq!(signature.input, Some(Slot::Opaque("String")));
        assert_eq!(signature.returns, vec![Slot::Opaque("String")]);
        assert!(signature.validate().is_err());
    }

    #[tokio::test]
    async fn test_call_assembles_input() {
        let values = vec![Bound::Json(Some(serde_json::json!("world")))];
        match Handler::call(&greet, values).await.unwrap() {
            Returned::Output(Ok(emits)) => {
                assert_eq!(emits, vec![Emit::Value(serde_json::json!("hello world"))]);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let values = vec![Bound::Json(None)];
        match Handler::call(&greet, values).await.unwrap() {
            Returned::Failed(Failure::Message(message)) => assert_eq!(message, "name is required"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_reports_conversion_errors() {
        let values = vec![Bound::Json(Some(serde_json::json!(42)))];
        let err = Handler::call(&greet, values).await.unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[tokio::test]
    async fn test_invoke_through_trait_object() {
        let invoker: Box<dyn Invoke> = Box::new(Bind::new(ping));
        assert!(matches!(invoker.invoke(Vec::new()).await, Ok(Returned::Nothing)));
    }
}
