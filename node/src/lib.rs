// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod escalation;
pub mod events;
pub mod recovery;
pub mod server;
pub mod state;
pub mod telemetry;
