//! Test utils.
//!
//! Available in unit tests and with the `test_utils` feature enabled. Provides a small excerpt
//! of the `common` dialect and a logger setup.

use std::sync::Arc;

use crate::dialect::{
    DialectDefinition, EnumDefinition, FieldDescription, MessageDefinition, MessageRegistry,
};

/// Log level applied to this crate by [`init_logger`].
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Trace;

/// Dialect with `HEARTBEAT`, `SYS_STATUS`, `PARAM_VALUE`, `ATTITUDE_QUATERNION_COV` and
/// `STATUSTEXT` messages and the enums they reference.
///
/// Field declarations match the `common` dialect, so CRC extras are the reference ones.
pub fn sample_dialect() -> DialectDefinition {
    DialectDefinition::new("sample")
        .message(heartbeat())
        .message(sys_status())
        .message(param_value())
        .message(attitude_quaternion_cov())
        .message(statustext())
        .enumeration(
            EnumDefinition::new("MAV_TYPE")
                .entry("MAV_TYPE_GENERIC", 0)
                .entry("MAV_TYPE_FIXED_WING", 1)
                .entry("MAV_TYPE_QUADROTOR", 2)
                .entry("MAV_TYPE_GCS", 6),
        )
        .enumeration(
            EnumDefinition::new("MAV_AUTOPILOT")
                .entry("MAV_AUTOPILOT_GENERIC", 0)
                .entry("MAV_AUTOPILOT_ARDUPILOTMEGA", 3)
                .entry("MAV_AUTOPILOT_INVALID", 8)
                .entry("MAV_AUTOPILOT_PX4", 12),
        )
        .enumeration(
            EnumDefinition::bitmask("MAV_MODE_FLAG")
                .entry("MAV_MODE_FLAG_CUSTOM_MODE_ENABLED", 1)
                .entry("MAV_MODE_FLAG_TEST_ENABLED", 2)
                .entry("MAV_MODE_FLAG_AUTO_ENABLED", 4)
                .entry("MAV_MODE_FLAG_GUIDED_ENABLED", 8)
                .entry("MAV_MODE_FLAG_STABILIZE_ENABLED", 16)
                .entry("MAV_MODE_FLAG_HIL_ENABLED", 32)
                .entry("MAV_MODE_FLAG_MANUAL_INPUT_ENABLED", 64)
                .entry("MAV_MODE_FLAG_SAFETY_ARMED", 128),
        )
        .enumeration(
            EnumDefinition::new("MAV_STATE")
                .entry("MAV_STATE_UNINIT", 0)
                .entry("MAV_STATE_BOOT", 1)
                .entry("MAV_STATE_CALIBRATING", 2)
                .entry("MAV_STATE_STANDBY", 3)
                .entry("MAV_STATE_ACTIVE", 4)
                .entry("MAV_STATE_CRITICAL", 5)
                .entry("MAV_STATE_EMERGENCY", 6)
                .entry("MAV_STATE_POWEROFF", 7),
        )
        .enumeration(
            EnumDefinition::new("MAV_SEVERITY")
                .entry("MAV_SEVERITY_EMERGENCY", 0)
                .entry("MAV_SEVERITY_ALERT", 1)
                .entry("MAV_SEVERITY_CRITICAL", 2)
                .entry("MAV_SEVERITY_ERROR", 3)
                .entry("MAV_SEVERITY_WARNING", 4)
                .entry("MAV_SEVERITY_NOTICE", 5)
                .entry("MAV_SEVERITY_INFO", 6)
                .entry("MAV_SEVERITY_DEBUG", 7),
        )
        .enumeration(
            EnumDefinition::new("MAV_PARAM_TYPE")
                .entry("MAV_PARAM_TYPE_UINT8", 1)
                .entry("MAV_PARAM_TYPE_INT8", 2)
                .entry("MAV_PARAM_TYPE_UINT16", 3)
                .entry("MAV_PARAM_TYPE_INT16", 4)
                .entry("MAV_PARAM_TYPE_UINT32", 5)
                .entry("MAV_PARAM_TYPE_INT32", 6)
                .entry("MAV_PARAM_TYPE_REAL32", 9),
        )
}

/// Compiled [`sample_dialect`].
///
/// # Panics
///
/// Never, the sample dialect is known to compile.
pub fn sample_registry() -> Arc<MessageRegistry> {
    Arc::new(MessageRegistry::compile(&sample_dialect()).unwrap())
}

/// Installs `env_logger` once per process.
///
/// Third-party crates log at `warn` and above, this crate at [`LOG_LEVEL`].
#[cfg(test)]
pub fn init_logger() {
    use std::sync::Once;
    static INIT_LOGGER: Once = Once::new();

    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module(env!("CARGO_PKG_NAME"), LOG_LEVEL)
            .is_test(true)
            .init();
    });
}

fn heartbeat() -> MessageDefinition {
    MessageDefinition::new(0, "HEARTBEAT")
        .field(FieldDescription::new("uint8_t", "type").with_enum("MAV_TYPE"))
        .field(FieldDescription::new("uint8_t", "autopilot").with_enum("MAV_AUTOPILOT"))
        .field(FieldDescription::new("uint8_t", "base_mode").with_enum("MAV_MODE_FLAG"))
        .field(FieldDescription::new("uint32_t", "custom_mode"))
        .field(FieldDescription::new("uint8_t", "system_status").with_enum("MAV_STATE"))
        .field(FieldDescription::new(
            "uint8_t_mavlink_version",
            "mavlink_version",
        ))
}

fn sys_status() -> MessageDefinition {
    let mut message = MessageDefinition::new(1, "SYS_STATUS")
        .field(FieldDescription::new("uint32_t", "onboard_control_sensors_present"))
        .field(FieldDescription::new("uint32_t", "onboard_control_sensors_enabled"))
        .field(FieldDescription::new("uint32_t", "onboard_control_sensors_health"))
        .field(FieldDescription::new("uint16_t", "load"))
        .field(FieldDescription::new("uint16_t", "voltage_battery"))
        .field(FieldDescription::new("int16_t", "current_battery"))
        .field(FieldDescription::new("int8_t", "battery_remaining"))
        .field(FieldDescription::new("uint16_t", "drop_rate_comm"))
        .field(FieldDescription::new("uint16_t", "errors_comm"));
    for counter in 1..=4 {
        message = message.field(FieldDescription::new(
            "uint16_t",
            format!("errors_count{counter}"),
        ));
    }
    for suffix in ["present", "enabled", "health"] {
        message = message.field(
            FieldDescription::new(
                "uint32_t",
                format!("onboard_control_sensors_{suffix}_extended"),
            )
            .extension(),
        );
    }
    message
}

fn param_value() -> MessageDefinition {
    MessageDefinition::new(22, "PARAM_VALUE")
        .field(FieldDescription::new("char[16]", "param_id"))
        .field(FieldDescription::new("float", "param_value"))
        .field(FieldDescription::new("uint8_t", "param_type").with_enum("MAV_PARAM_TYPE"))
        .field(FieldDescription::new("uint16_t", "param_count"))
        .field(FieldDescription::new("uint16_t", "param_index"))
}

fn attitude_quaternion_cov() -> MessageDefinition {
    MessageDefinition::new(61, "ATTITUDE_QUATERNION_COV")
        .field(FieldDescription::new("uint64_t", "time_usec"))
        .field(FieldDescription::new("float[4]", "q"))
        .field(FieldDescription::new("float", "rollspeed"))
        .field(FieldDescription::new("float", "pitchspeed"))
        .field(FieldDescription::new("float", "yawspeed"))
        .field(FieldDescription::new("float[9]", "covariance"))
}

fn statustext() -> MessageDefinition {
    MessageDefinition::new(253, "STATUSTEXT")
        .field(FieldDescription::new("uint8_t", "severity").with_enum("MAV_SEVERITY"))
        .field(FieldDescription::new("char[50]", "text"))
        .field(FieldDescription::new("uint16_t", "id").extension())
        .field(FieldDescription::new("uint8_t", "chunk_seq").extension())
}
