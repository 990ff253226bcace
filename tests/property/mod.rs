// Copyright (c) 2025 - Hotswap Core Contributors
//! Property test modules

mod classification;
mod store_chain;
mod subjects;
