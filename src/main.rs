//! Gap - Example Server
//!
//! This example demonstrates binding plain async functions as endpoints.

use bytes::Bytes;
use gap::prelude::*;
use tracing_subscriber::EnvFilter;

/// Input of the "hello" endpoint.
#[derive(Input)]
struct HelloRequest {
    #[request("json,name")]
    name: String,
    #[request("header,x-greeting")]
    greeting: Option<String>,
}

#[derive(Output)]
struct HelloResponse {
    #[response("json,message")]
    message: String,
}

async fn hello(input: HelloRequest) -> Result<HelloResponse, String> {
    if input.name.is_empty() {
        return Err("name is required".to_string());
    }
    let greeting = input.greeting.unwrap_or_else(|| "hello".to_string());
    Ok(HelloResponse {
        message: format!("{} {}", greeting, input.name),
    })
}

#[derive(Input)]
struct LoginRequest {
    #[request("header,authorization")]
    token: String,
}

#[derive(Output)]
struct LoginResponse {
    #[response("status")]
    status: u16,
    #[response("header,location")]
    location: String,
    #[response("json,user")]
    user: String,
}

/// Failure carrying its own status and body shape.
#[derive(IntoFailure)]
struct AuthError {
    #[response("status")]
    status: u16,
    #[response("json,message")]
    message: String,
}

async fn login(input: LoginRequest) -> Result<LoginResponse, AuthError> {
    match input.token.strip_prefix("Bearer ") {
        Some(user) if !user.is_empty() => Ok(LoginResponse {
            status: 201,
            location: format!("/users/{}", user),
            user: user.to_string(),
        }),
        _ => Err(AuthError {
            status: 401,
            message: "auth error".to_string(),
        }),
    }
}

#[derive(Input)]
struct EchoRequest {
    #[request("body")]
    body: Bytes,
    #[request("query,type")]
    content_type: String,
}

#[derive(Output)]
struct EchoResponse {
    #[response("header,content-type")]
    content_type: String,
    #[response("body")]
    body: Bytes,
}

async fn echo(input: EchoRequest) -> EchoResponse {
    let content_type = if input.content_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        input.content_type
    };
    EchoResponse {
        content_type,
        body: input.body,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Gap example server...");

    let config = ServerConfig::new().host("0.0.0.0").port(8000);

    let mut app = App::new();
    app.post("/hello", hello)?
        .post("/login", login)?
        .post("/echo", echo)?;

    tracing::info!("Try: curl -d '{{\"name\":\"world\"}}' http://localhost:8000/hello");
    tracing::info!("Try: curl -X POST -H 'Authorization: Bearer ada' http://localhost:8000/login");
    tracing::info!("Try: curl -d 'test' 'http://localhost:8000/echo?type=text/plain'");

    app.serve(config).await
}
