/// Shaped position of an analog stick. `y` grows upward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
}

impl StickPosition {
    /// True when the stick is outside its dead zone.
    #[inline]
    pub fn is_pushed(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }

    #[inline]
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Radial dead zone followed by a power response curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickShape {
    /// Radius below which the stick reads as centered.
    pub inner_deadzone: f32,
    /// Exponent applied to the magnitude left after the dead zone.
    /// 1.0 is linear, 3.0 is a cubic ease-in.
    pub curve: f32,
}

impl StickShape {
    pub const LINEAR: Self = Self {
        inner_deadzone: 0.0,
        curve: 1.0,
    };

    pub fn apply(&self, x: f32, y: f32) -> StickPosition {
        let mag = (x * x + y * y).sqrt();
        let dead = self.inner_deadzone.clamp(0.0, 0.99);
        if mag <= dead {
            return StickPosition::default();
        }
        let base = ((mag.min(1.0) - dead) / (1.0 - dead)).clamp(0.0, 1.0);
        let curve = self.curve.max(0.1);
        let shaped = if (curve - 1.0).abs() < 1e-6 {
            base
        } else {
            base.powf(curve)
        };
        let scale = shaped / mag;
        StickPosition {
            x: x * scale,
            y: y * scale,
        }
    }
}

impl Default for StickShape {
    fn default() -> Self {
        Self::LINEAR
    }
}
