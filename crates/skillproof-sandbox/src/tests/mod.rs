//! Tests for the skill sandbox.

mod behaviour;
mod support;
