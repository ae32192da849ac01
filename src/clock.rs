/*
    rawtrack
    https://github.com/dbalsom/rawtrack

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! The `clock` module defines the time units the engine exchanges with its
//! host.
//!
//! Two clocks are involved: the system clock (`sysclk`, 72 MHz) in which
//! bitcell timing is expressed, and a slower system-tick timer (`stk`,
//! sysclk / 8) in which revolution periods are measured. Hosts with
//! different hardware clocks only need to rescale at the boundary; all
//! internal arithmetic is done in these units.

/// System clock frequency in MHz.
pub const SYSCLK_MHZ: u32 = 72;

/// Ratio of the system clock to the system-tick timer.
pub const STK_SYSCLK_RATIO: u32 = 8;

/// Convert milliseconds to system-tick units.
pub const fn stk_ms(ms: u32) -> u32 {
    ms * (SYSCLK_MHZ / STK_SYSCLK_RATIO) * 1000
}

/// Convert system-tick units to system-clock ticks.
pub const fn sysclk_stk(stk: u32) -> u32 {
    stk * STK_SYSCLK_RATIO
}

/// Convert microseconds to system-clock ticks.
pub const fn sysclk_us(us: u32) -> u32 {
    us * SYSCLK_MHZ
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revolution_scale() {
        // One revolution at 300 RPM is 200ms.
        let stk_per_rev = stk_ms(200) * 300 / 300;
        // A double-density track is 100,000 bitcells; each cell should come
        // out at 2us of system clock, scaled by 16.
        let ticks_per_cell = sysclk_stk(stk_per_rev) * 16 / 100_000;
        assert_eq!(ticks_per_cell / 16, 2 * SYSCLK_MHZ);
    }
}
