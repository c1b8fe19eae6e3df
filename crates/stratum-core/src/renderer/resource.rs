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

//! The state-tracked GPU resource wrapper.

use crate::renderer::api::{Barrier, CommandList, ResourceDesc, ResourceId, ResourceState};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;

/// One GPU buffer or texture together with the state it was last transitioned to.
///
/// `Resource` is the single point of truth for barrier bookkeeping: every state
/// change of the underlying native resource goes through
/// [`transition_state`](Self::transition_state) or
/// [`transition_state_batched`](Self::transition_state_batched).
#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    desc: ResourceDesc,
    state: ResourceState,
}

impl Resource {
    /// Creates the native resource on `device` in `initial_state`.
    pub fn create(
        device: &dyn GraphicsDevice,
        desc: ResourceDesc,
        initial_state: ResourceState,
    ) -> Result<Self, ResourceError> {
        let id = device.create_resource(&desc, initial_state)?;
        log::trace!("Created resource '{}' ({id:?}) in {initial_state:?}", desc.label);
        Ok(Self {
            id,
            desc,
            state: initial_state,
        })
    }

    /// Wraps a resource the device created itself, such as a back buffer.
    pub fn from_existing(id: ResourceId, desc: ResourceDesc, state: ResourceState) -> Self {
        Self { id, desc, state }
    }

    /// The native resource handle.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The creation parameters.
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    /// The last recorded state.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// `(width, height)` of the resource.
    pub fn extent(&self) -> (u32, u32) {
        self.desc.extent()
    }

    /// Records a transition to `new_state` on `list`.
    ///
    /// Does nothing if the resource is already in `new_state`. Otherwise exactly
    /// one barrier is recorded and the tracked state is updated.
    ///
    /// # Returns
    ///
    /// `true` if a barrier was recorded.
    pub fn transition_state(&mut self, new_state: ResourceState, list: &mut CommandList) -> bool {
        match self.make_barrier(new_state) {
            Some(barrier) => {
                list.resource_barrier(&[barrier]);
                true
            }
            None => false,
        }
    }

    /// Appends a transition to `new_state` to a caller-owned batch.
    ///
    /// Same contract as [`transition_state`](Self::transition_state), but the barrier
    /// is accumulated into `barriers` so several resources can be transitioned with
    /// a single [`CommandList::resource_barrier`] call.
    pub fn transition_state_batched(
        &mut self,
        new_state: ResourceState,
        barriers: &mut Vec<Barrier>,
    ) -> bool {
        match self.make_barrier(new_state) {
            Some(barrier) => {
                barriers.push(barrier);
                true
            }
            None => false,
        }
    }

    fn make_barrier(&mut self, new_state: ResourceState) -> Option<Barrier> {
        if self.state == new_state {
            return None;
        }
        let barrier = Barrier {
            resource: self.id,
            before: self.state,
            after: new_state,
        };
        self.state = new_state;
        Some(barrier)
    }

    /// Destroys the native resource.
    pub fn release(self, device: &dyn GraphicsDevice) {
        log::trace!("Releasing resource '{}' ({:?})", self.desc.label, self.id);
        device.destroy_resource(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{CommandAllocator, Format, ResourceUsage};

    fn texture() -> Resource {
        Resource::from_existing(
            ResourceId(7),
            ResourceDesc::texture_2d("t", 4, 4, Format::Rgba16Float, ResourceUsage::RenderTarget),
            ResourceState::Common,
        )
    }

    #[test]
    fn repeated_transition_records_a_single_barrier() {
        let mut allocator = CommandAllocator::new();
        let mut list = CommandList::new();
        list.reset(&mut allocator);
        let mut resource = texture();

        assert!(resource.transition_state(ResourceState::RenderTarget, &mut list));
        assert!(!resource.transition_state(ResourceState::RenderTarget, &mut list));

        let barriers: Vec<_> = list.barriers().collect();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].before, ResourceState::Common);
        assert_eq!(barriers[0].after, ResourceState::RenderTarget);
        assert_eq!(resource.state(), ResourceState::RenderTarget);
    }

    #[test]
    fn batched_transitions_accumulate_and_skip_no_ops() {
        let mut a = texture();
        let mut b = Resource::from_existing(
            ResourceId(8),
            ResourceDesc::texture_2d("b", 4, 4, Format::R8Unorm, ResourceUsage::RenderTarget),
            ResourceState::PixelShaderResource,
        );
        let mut batch = Vec::new();
        a.transition_state_batched(ResourceState::PixelShaderResource, &mut batch);
        b.transition_state_batched(ResourceState::PixelShaderResource, &mut batch);
        a.transition_state_batched(ResourceState::PixelShaderResource, &mut batch);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].resource, ResourceId(7));
    }

    #[test]
    fn state_round_trip_records_both_directions() {
        let mut allocator = CommandAllocator::new();
        let mut list = CommandList::new();
        list.reset(&mut allocator);
        let mut resource = texture();
        resource.transition_state(ResourceState::RenderTarget, &mut list);
        resource.transition_state(ResourceState::PixelShaderResource, &mut list);
        resource.transition_state(ResourceState::RenderTarget, &mut list);

        let afters: Vec<_> = list.barriers().map(|b| b.after).collect();
        assert_eq!(
            afters,
            vec![
                ResourceState::RenderTarget,
                ResourceState::PixelShaderResource,
                ResourceState::RenderTarget
            ]
        );
    }
}
