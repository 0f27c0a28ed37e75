use serde::{Deserialize, Serialize};

/// PID gains plus the symmetric integral clamp used for anti-windup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub integral_limit: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.6,
            ki: 0.0,
            kd: 0.15,
            integral_limit: 200.0,
        }
    }
}

/// Turns lateral pixel error into a steering delta.
///
/// State lives for the whole run and is never reset.
#[derive(Debug, Clone)]
pub struct SteeringController {
    gains: PidGains,
    integral: f32,
    previous_error: f32,
}

impl SteeringController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    pub fn compute(&mut self, error: f32) -> f32 {
        self.integral += error;
        let derivative = error - self.previous_error;
        let limit = self.gains.integral_limit.abs();
        self.integral = self.integral.clamp(-limit, limit);
        self.previous_error = error;
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }
}

impl Default for SteeringController {
    fn default() -> Self {
        Self::new(PidGains::default())
    }
}
