use crate::collision::{Aabb, CollisionGrid, CollisionMoveResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerInput {
    pub move_x: f32,
    pub jump_pressed: bool,
    pub jump_held: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub max_speed: f32,
    pub accel_ground: f32,
    pub accel_air: f32,
    pub friction_ground: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_speed: f32,
    /// Upward speed kept when jump is released early.
    pub jump_cut_speed: f32,
    /// Seconds after leaving a ledge during which a jump still counts.
    pub coyote_time: f32,
    /// Seconds a jump press is remembered before landing.
    pub jump_buffer: f32,
    pub bounce_speed: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_speed: 200.0,
            accel_ground: 1600.0,
            accel_air: 900.0,
            friction_ground: 2000.0,
            gravity: -1800.0,
            max_fall_speed: -900.0,
            jump_speed: 640.0,
            jump_cut_speed: 260.0,
            coyote_time: 0.1,
            jump_buffer: 0.12,
            bounce_speed: 420.0,
        }
    }
}

/// What happened during one controller step, for sound cues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub jumped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterController {
    pub aabb: Aabb,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub grounded: bool,
    pub config: ControllerConfig,
    pub facing: f32,
    coyote_timer: f32,
    jump_buffer_timer: f32,
}

impl CharacterController {
    pub fn new(aabb: Aabb) -> Self {
        Self {
            aabb,
            velocity_x: 0.0,
            velocity_y: 0.0,
            grounded: false,
            config: ControllerConfig::default(),
            facing: 1.0,
            coyote_timer: 0.0,
            jump_buffer_timer: 0.0,
        }
    }

    pub fn step(&mut self, input: ControllerInput, dt: f32, collision_grid: &CollisionGrid) -> StepEvents {
        let mut events = StepEvents::default();
        let accel = if self.grounded {
            self.config.accel_ground
        } else {
            self.config.accel_air
        };

        if input.move_x != 0.0 {
            let target = input.move_x * self.config.max_speed;
            self.velocity_x = move_towards(self.velocity_x, target, accel * dt);
            self.facing = input.move_x.signum();
        } else if self.grounded {
            self.velocity_x = move_towards(self.velocity_x, 0.0, self.config.friction_ground * dt);
        }

        if self.grounded {
            self.coyote_timer = self.config.coyote_time;
        } else {
            self.coyote_timer = (self.coyote_timer - dt).max(0.0);
        }
        if input.jump_pressed {
            self.jump_buffer_timer = self.config.jump_buffer;
        } else {
            self.jump_buffer_timer = (self.jump_buffer_timer - dt).max(0.0);
        }

        if self.jump_buffer_timer > 0.0 && self.coyote_timer > 0.0 {
            self.velocity_y = self.config.jump_speed;
            self.grounded = false;
            self.coyote_timer = 0.0;
            self.jump_buffer_timer = 0.0;
            events.jumped = true;
        }

        // Releasing jump while rising shortens the arc.
        if !input.jump_held && self.velocity_y > self.config.jump_cut_speed {
            self.velocity_y = self.config.jump_cut_speed;
        }

        self.velocity_y = (self.velocity_y + self.config.gravity * dt).max(self.config.max_fall_speed);

        let dx = self.velocity_x * dt;
        let dy = self.velocity_y * dt;
        let result = collision_grid.move_and_collide_detailed(self.aabb, dx, dy);
        self.apply_collision_result(result);
        events
    }

    /// Launch upward after stomping an enemy.
    pub fn bounce(&mut self) {
        self.velocity_y = self.config.bounce_speed;
        self.grounded = false;
        self.coyote_timer = 0.0;
    }

    /// Shove away from a hazard at `from_x`.
    pub fn knockback(&mut self, from_x: f32) {
        let away = if self.aabb.center_x < from_x { -1.0 } else { 1.0 };
        self.velocity_x = away * self.config.max_speed;
        self.velocity_y = self.config.bounce_speed * 0.6;
        self.grounded = false;
    }

    fn apply_collision_result(&mut self, result: CollisionMoveResult) {
        self.aabb = result.aabb;

        if (result.blocked_left && self.velocity_x < 0.0)
            || (result.blocked_right && self.velocity_x > 0.0)
        {
            self.velocity_x = 0.0;
        }

        if result.blocked_up && self.velocity_y > 0.0 {
            self.velocity_y = 0.0;
        }
        // Grounded comes from collision contact, not from y-position heuristics.
        if result.blocked_down && self.velocity_y < 0.0 {
            self.velocity_y = 0.0;
            self.grounded = true;
        } else if result.collided_y {
            self.velocity_y = 0.0;
            self.grounded = false;
        } else {
            self.grounded = false;
        }
    }

    pub fn is_falling(&self) -> bool {
        self.velocity_y < 0.0
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else if target > current {
        current + max_delta
    } else {
        current - max_delta
    }
}
