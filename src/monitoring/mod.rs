// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

//! Observability: Prometheus metrics.

pub mod metrics;
