//! This is an example of building a fourth, custom adapter (Rocket isn't one
//! of the three shapes [`bridge_core::adapter`] ships) on top of the shared
//! [`bridge_core::adapter::normalize`] primitive and [`bridge_core::Dispatcher`].
//!
//! Run this with `cargo run --example rocket` and then try:
//!
//! curl -X POST localhost:8000/api/echo -H 'content-type: application/json' -d '"hello"'
//! curl -X POST localhost:8000/api/reverse -H 'content-type: application/json' -d '[1,2,3,4,5]'
//!
//! To see it in action (assuming port 8000).
use bridge_core::{BridgeConfig, Dispatcher, RouteRegistry};
use http::header::HeaderName;
use rocket::data::ToByteUnit;
use rocket::handler::{Handler, Outcome};
use rocket::{http::Method, http::Status, Data, Request, Route};
use std::io::Cursor;
use std::sync::Arc;

#[rocket::launch]
fn rocket() -> rocket::Rocket {
    let mut registry: RouteRegistry<()> = RouteRegistry::new();

    registry
        .route("echo")
        .description("Echoes back a JSON string")
        .handler(|body: String, _ctx| async move { Ok::<_, std::convert::Infallible>(body) });
    registry
        .route("reverse")
        .description("Reverse an array of numbers")
        .handler(|body: Vec<usize>, _ctx| async move {
            Ok::<_, std::convert::Infallible>(body.into_iter().rev().collect::<Vec<usize>>())
        });

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), BridgeConfig::new().prefix("/api")));

    rocket::ignite().mount("/", BridgeApi(dispatcher))
}

// Wrap our `bridge_core::Dispatcher` in a thing that Rocket can work with.
#[derive(Clone)]
struct BridgeApi(Arc<Dispatcher<()>>);

#[rocket::async_trait]
impl Handler for BridgeApi {
    async fn handle<'r, 's: 'r>(&'s self, req: &'r Request<'_>, data: Data) -> Outcome<'r> {
        // Turn the body into a vec of bytes (max 4MB here):
        let max_body_size = 4.megabytes();
        let body = match data.open(max_body_size).stream_to_vec().await {
            Ok(bytes) => bytes,
            Err(_e) => return Outcome::failure(Status::BadRequest),
        };

        // Rebuild the headers Rocket parsed into the `http` crate's HeaderMap
        // that `normalize` expects.
        let mut headers = http::HeaderMap::new();
        for header in req.headers().iter() {
            let name = HeaderName::from_lowercase(header.name().to_string().to_lowercase().as_bytes());
            if let Ok(name) = name {
                if let Ok(value) = header.value().parse() {
                    headers.insert(name, value);
                }
            }
        }

        let method = match req.method().as_str().parse::<http::Method>() {
            Ok(m) => m,
            Err(_) => return Outcome::failure(Status::BadRequest),
        };

        let normalized = match bridge_core::adapter::normalize(
            self.0.config(),
            &method,
            req.uri().path(),
            &headers,
            body.into(),
            None,
        ) {
            Ok(req) => req,
            Err(_) => return Outcome::failure(Status::NotFound),
        };

        let (status, response_body) = self.0.dispatch_http(normalized, ()).await;
        let bytes = serde_json::to_vec(&response_body).unwrap_or_default();
        let rocket_response = rocket::Response::build()
            .status(Status::new(status, ""))
            .header(rocket::http::ContentType::JSON)
            .sized_body(bytes.len(), Cursor::new(bytes))
            .finalize();
        Outcome::Success(rocket_response)
    }
}

impl Into<Vec<Route>> for BridgeApi {
    fn into(self) -> Vec<Route> {
        // Show Rocket what routes exist by inspecting the registry:
        self.0
            .registry()
            .iter()
            .map(|r| {
                let method = match r.method.to_string().as_str() {
                    "GET" => Method::Get,
                    _ => Method::Post,
                };
                Route::new(method, format!("/{}", r.name), self.clone())
            })
            .collect()
    }
}
