//! Defaults shared by the control unit and the tuning tools.
//!
//! Values match the first axis of the field rig (linear stage, mm).

// ─── Encoder ────────────────────────────────────────────────────────

/// Physical units per encoder count [mm/count].
pub const ENCODER_GAIN_DEFAULT: f64 = 0.011_270_884_64;
/// Default quadrature input line A (BCM numbering).
pub const ENCODER_PIN_A_DEFAULT: u8 = 24;
/// Default quadrature input line B (BCM numbering).
pub const ENCODER_PIN_B_DEFAULT: u8 = 25;
/// Edge glitch filter [µs].
pub const GLITCH_FILTER_US_DEFAULT: u32 = 100;

// ─── Driver ─────────────────────────────────────────────────────────

/// Smallest valid motor channel.
pub const CHANNEL_MIN: u8 = 1;
/// Largest valid motor channel.
pub const CHANNEL_MAX: u8 = 3;
/// Driver-side speed range (±).
pub const SPEED_LIMIT: i32 = 800;
/// Driver command timeout [ms].
pub const COMMAND_TIMEOUT_MS_DEFAULT: u32 = 500;
/// Max acceleration [speed units per 10 ms update].
pub const MAX_ACCELERATION_DEFAULT: u16 = 150;
/// Max deceleration [speed units per 10 ms update].
pub const MAX_DECELERATION_DEFAULT: u16 = 300;
/// Driver acceleration update period [s].
pub const DRIVER_UPDATE_PERIOD_S: f64 = 0.01;

// ─── Controller ─────────────────────────────────────────────────────

/// dt used on the first PID tick [s].
pub const PID_DEFAULT_DT: f64 = 0.01;
/// Derivative smoothing factor.
pub const DERIVATIVE_ALPHA_DEFAULT: f64 = 0.2;
/// Commands with |value| below this are sent as 0.
pub const DEADBAND_DEFAULT: i32 = 15;
/// Settle tolerance [mm].
pub const SETTLE_EPSILON_DEFAULT: f64 = 0.15;
/// Consecutive in-tolerance samples required to settle.
pub const SETTLE_THRESHOLD_DEFAULT: u32 = 20;

// ─── Cycle ──────────────────────────────────────────────────────────

/// Control loop period [ms].
pub const CYCLE_TIME_MS_DEFAULT: u64 = 50;
/// Minimum control loop period [ms].
pub const CYCLE_TIME_MS_MIN: u64 = 1;
/// Maximum control loop period [ms].
pub const CYCLE_TIME_MS_MAX: u64 = 1000;

// ─── Safety ─────────────────────────────────────────────────────────

/// Minimum supply voltage [mV].
pub const MIN_SUPPLY_MV_DEFAULT: u32 = 4500;
/// Attempts for a status or voltage read.
pub const RETRY_ATTEMPTS_DEFAULT: u32 = 3;
/// Delay between read attempts [ms].
pub const RETRY_BACKOFF_MS_DEFAULT: u64 = 50;

// ─── Setpoint ───────────────────────────────────────────────────────

/// Target file written by the external scheduler.
pub const SETPOINT_PATH_DEFAULT: &str = "motor1_target.txt";
