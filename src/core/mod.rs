// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

//! Core protocol: canonical codec, record types, signing, wallet, store, engine.

pub mod codec;
pub mod engine;
pub mod publisher;
pub mod rules;
pub mod signing;
pub mod store;
pub mod types;
pub mod wallet;
