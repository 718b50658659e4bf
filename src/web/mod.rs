//! HTTP API for content classification and negotiation.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! mime-sleuth serve
//!
//! # Custom port and detector config
//! mime-sleuth serve --port 3000 --config sleuth.json
//!
//! # Bind to all interfaces
//! mime-sleuth serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /api/classify` - Classify an uploaded file (multipart `file` field)
//! - `GET /api/negotiate?provided=a/b,c/d` - Pick a type for the request's `Accept` header
//! - `GET /api/detectors` - List registered detectors

pub mod server;
