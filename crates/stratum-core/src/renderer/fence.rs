// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CPU/GPU synchronization through a monotonically increasing counter.

use crate::renderer::api::FenceId;
use crate::renderer::error::RenderError;
use crate::renderer::traits::GraphicsDevice;
use std::sync::Arc;

/// A fence whose signaled values strictly increase.
#[derive(Debug)]
pub struct Fence {
    id: FenceId,
    device: Arc<dyn GraphicsDevice>,
    last_signaled: u64,
}

impl Fence {
    /// Creates a fence whose completed value starts at zero.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Result<Self, RenderError> {
        let id = device.create_fence(0)?;
        Ok(Self {
            id,
            device,
            last_signaled: 0,
        })
    }

    /// The backend fence handle.
    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Enqueues a signal after all submitted work and returns its ticket.
    ///
    /// Tickets returned by successive calls are strictly increasing.
    pub fn signal(&mut self) -> Result<u64, RenderError> {
        let ticket = self.last_signaled + 1;
        self.device.signal_fence(self.id, ticket)?;
        self.last_signaled = ticket;
        Ok(ticket)
    }

    /// The last ticket handed out by [`signal`](Self::signal).
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    /// The last value the GPU has reached.
    pub fn completed_value(&self) -> u64 {
        self.device.fence_completed_value(self.id)
    }

    /// Blocks until the GPU reaches `ticket`.
    ///
    /// Returns immediately if the ticket is already completed. Otherwise the
    /// calling thread sleeps with no timeout: a hung GPU hangs the caller.
    pub fn wait(&self, ticket: u64) -> Result<(), RenderError> {
        if self.completed_value() >= ticket {
            return Ok(());
        }
        log::trace!("Waiting for fence {:?} to reach {ticket}", self.id);
        self.device.wait_for_fence(self.id, ticket)
    }

    /// Signals and waits: afterwards the GPU is idle with respect to prior submissions.
    pub fn flush(&mut self) -> Result<(), RenderError> {
        let ticket = self.signal()?;
        self.wait(ticket)
    }
}
