//! # Rig Control Unit Library
//!
//! Closed-loop position control for one DC motor axis against quadrature
//! encoder feedback. A sleep-paced loop reads the encoder, runs a filtered
//! PID with conditional-integration anti-windup, shapes the command and
//! sends it to the motor driver, gated every tick by a fault monitor.
//!
//! ## Data Flow
//!
//! ```text
//! setpoint file ──► SetpointPoller ──mpsc──► SetpointInbox
//!                                                 │
//! encoder edges ──► PulseCounter ──AtomicI64──► PositionEstimator
//!                                                 │
//!                       FilteredPid + CommandShaper + SettlingDetector
//!                                                 │
//!                  MotorSafetyMonitor ──gate──► MotorDriver::set_speed
//! ```
//!
//! ## Shared State
//!
//! The pulse counter is the only value written from another thread (the
//! encoder callback). Everything else is owned by [`cycle::ControlLoop`].

pub mod config;
pub mod control;
pub mod cycle;
pub mod encoder;
pub mod error;
pub mod safety;
pub mod setpoint;
