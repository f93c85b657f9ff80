// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-made [`Checkpointable`] implementations

use crate::archive::Payload;
use crate::checkpoint::{CheckpointError, Checkpointable};
use el_core::{Counter, Every, Once, Ratio, Until};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize any serde value into a payload
pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload, CheckpointError> {
    Ok(serde_json::to_value(value)?)
}

/// Deserialize a payload into any serde value
pub fn from_payload<T: DeserializeOwned>(payload: Payload) -> Result<T, CheckpointError> {
    Ok(serde_json::from_value(payload)?)
}

/// Checkpointable built from a pair of closures
pub struct Saveable<S, L> {
    save: S,
    load: L,
}

impl<S, L> Saveable<S, L>
where
    S: Fn() -> Result<Payload, CheckpointError> + Send,
    L: FnMut(Payload) -> Result<(), CheckpointError> + Send,
{
    pub fn new(save: S, load: L) -> Self {
        Self { save, load }
    }
}

impl<S, L> Checkpointable for Saveable<S, L>
where
    S: Fn() -> Result<Payload, CheckpointError> + Send,
    L: FnMut(Payload) -> Result<(), CheckpointError> + Send,
{
    fn save(&self) -> Result<Payload, CheckpointError> {
        (self.save)()
    }

    fn load(&mut self, payload: Payload) -> Result<(), CheckpointError> {
        (self.load)(payload)
    }
}

macro_rules! checkpoint_via_serde {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Checkpointable for $ty {
                fn save(&self) -> Result<Payload, CheckpointError> {
                    to_payload(self)
                }

                fn load(&mut self, payload: Payload) -> Result<(), CheckpointError> {
                    *self = from_payload(payload)?;
                    Ok(())
                }
            }
        )*
    };
}

checkpoint_via_serde!(Counter, Every, Ratio, Once, Until);

#[cfg(test)]
#[path = "saveable_tests.rs"]
mod tests;
