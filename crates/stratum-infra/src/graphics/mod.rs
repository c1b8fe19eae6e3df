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

//! Graphics backends.

pub mod headless;
#[cfg(feature = "graphics")]
pub mod wgpu;

/// Distance in bytes between two descriptors, for backends that fake descriptor addresses.
pub(crate) const DESCRIPTOR_INCREMENT: u32 = 32;

/// Fake CPU address of descriptor 0 of heap `heap`.
pub(crate) fn cpu_heap_base(heap: u64) -> u64 {
    heap << 32
}

/// Fake GPU address of descriptor 0 of heap `heap`.
pub(crate) fn gpu_heap_base(heap: u64) -> u64 {
    (1 << 63) | (heap << 32)
}

/// Splits a fake CPU descriptor address into `(heap, index)`.
pub(crate) fn decode_cpu_handle(ptr: u64) -> (u64, u32) {
    (ptr >> 32, ((ptr & 0xFFFF_FFFF) / u64::from(DESCRIPTOR_INCREMENT)) as u32)
}

/// Splits a fake GPU descriptor address into `(heap, index)`.
pub(crate) fn decode_gpu_handle(ptr: u64) -> (u64, u32) {
    decode_cpu_handle(ptr & !(1 << 63))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_handles_decode_to_heap_and_index() {
        let cpu = cpu_heap_base(3) + 5 * u64::from(DESCRIPTOR_INCREMENT);
        let gpu = gpu_heap_base(3) + 5 * u64::from(DESCRIPTOR_INCREMENT);
        assert_eq!(decode_cpu_handle(cpu), (3, 5));
        assert_eq!(decode_gpu_handle(gpu), (3, 5));
    }
}
