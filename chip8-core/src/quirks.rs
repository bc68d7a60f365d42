/*
Copyright 2020 Anish Jewalikar

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

/// Configuration for the handful of points where documented CHIP-8
/// variants disagree.
///
/// Generalizes the individual `*_quirk` fields this interpreter used
/// to carry separately (`load_store_quirk`, `shift_quirk`, `jump_quirk`)
/// into a single `Copy` config struct, and adds the two switches those
/// fields didn't cover: the 8XY1/2/3 VF-reset behavior and sprite
/// wrap-vs-clip at the framebuffer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// `8XY1`/`8XY2`/`8XY3` reset VF to 0 (original COSMAC VIP behavior).
    /// Most modern ROMs expect VF to be left untouched; default `false`.
    pub vf_reset_on_logic: bool,
    /// `8XY6`/`8XYE` shift `Vy` into `Vx` before shifting, rather than
    /// shifting `Vx` in place. Default `false` (modern behavior).
    pub shift_uses_vy: bool,
    /// `FX55`/`FX65` increment `I` by `X + 1` after the transfer
    /// (original COSMAC VIP behavior). Default `false`; modern ROMs
    /// expect `I` to be left unchanged.
    pub load_store_increments_i: bool,
    /// Sprites drawn by `DXYN` wrap around the framebuffer edges
    /// instead of being clipped. Default `true`; most public ROMs
    /// expect wrapping.
    pub draw_wraps: bool,
    /// `BNNN` adds `V[X]` (the register selected by the jump target's
    /// high nibble) instead of `V[0]`. Default `false`.
    pub jumping_quirk_bnnn: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            vf_reset_on_logic: false,
            shift_uses_vy: false,
            load_store_increments_i: false,
            draw_wraps: true,
            jumping_quirk_bnnn: false,
        }
    }
}
