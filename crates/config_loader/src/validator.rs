//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (`validator` derive 声明于 contracts)
//! - max_boxes <= 256, imu.capacity > 0, fps > 0
//! - IMU 启用时，环形缓冲至少容纳一个图像帧间隔内的 IMU 样本
//! - 模式标志只在对应通道启用时有意义

use contracts::{BridgeConfig, ContractError, MAX_DETECTION_BOXES};
use validator::Validate;

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_limits(config)?;
    validate_imu_capacity(config)?;
    validate_mode_flags(config)?;
    Ok(())
}

/// 运行 derive 生成的范围校验
fn validate_ranges(config: &BridgeConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let mut fields: Vec<&str> = errors.errors().keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();
        ContractError::config_validation(fields.join(", "), errors.to_string())
    })
}

/// 校验硬性上限
fn validate_limits(config: &BridgeConfig) -> Result<(), ContractError> {
    if config.device.fps == 0 {
        return Err(ContractError::config_validation(
            "device.fps",
            "fps must be > 0",
        ));
    }
    if config.imu.capacity == 0 {
        return Err(ContractError::config_validation(
            "imu.capacity",
            "capacity must be > 0",
        ));
    }
    if config.detection.max_boxes > MAX_DETECTION_BOXES {
        return Err(ContractError::config_validation(
            "detection.max_boxes",
            format!(
                "max_boxes ({}) must be <= {MAX_DETECTION_BOXES}",
                config.detection.max_boxes
            ),
        ));
    }
    Ok(())
}

/// 校验 IMU 缓冲容量
fn validate_imu_capacity(config: &BridgeConfig) -> Result<(), ContractError> {
    if !config.channels.imu.enabled {
        return Ok(());
    }
    let per_frame = config.device.imu_frequency_hz.div_ceil(config.device.fps.max(1)) as usize;
    if config.imu.capacity < per_frame {
        return Err(ContractError::config_validation(
            "imu.capacity",
            format!(
                "capacity ({}) is below one frame interval of IMU samples ({per_frame} at {} Hz / {} fps)",
                config.imu.capacity, config.device.imu_frequency_hz, config.device.fps
            ),
        ));
    }
    Ok(())
}

/// 校验模式标志
fn validate_mode_flags(config: &BridgeConfig) -> Result<(), ContractError> {
    let channels = &config.channels;
    if channels.depth.high_accuracy && !channels.depth.enabled {
        return Err(ContractError::config_validation(
            "channels.depth.high_accuracy",
            "mode flag set on a disabled channel",
        ));
    }
    let disparity = &channels.disparity;
    if (disparity.high_accuracy || disparity.lr_check) && !disparity.enabled {
        return Err(ContractError::config_validation(
            "channels.disparity",
            "mode flag set on a disabled channel",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn test_fps_out_of_range() {
        let mut config = BridgeConfig::default();
        config.device.fps = 0;
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(&err, ContractError::ConfigValidation { field, .. } if field == "device"),
            "got: {err}"
        );
    }

    #[test]
    fn test_max_boxes_above_limit() {
        let mut config = BridgeConfig::default();
        config.detection.max_boxes = 300;
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(&err, ContractError::ConfigValidation { field, .. } if field == "detection"),
            "got: {err}"
        );
    }

    #[test]
    fn test_limits_direct() {
        let mut config = BridgeConfig::default();
        config.imu.capacity = 0;
        let err = validate_limits(&config).unwrap_err().to_string();
        assert!(err.contains("capacity must be > 0"), "got: {err}");
    }

    #[test]
    fn test_imu_capacity_below_frame_interval() {
        let mut config = BridgeConfig::default();
        config.channels.imu.enabled = true;
        config.device.fps = 10;
        config.device.imu_frequency_hz = 1000;
        config.imu.capacity = 50;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("one frame interval"), "got: {err}");

        // 通道未启用时不检查
        config.channels.imu.enabled = false;
        assert!(validate(&config).is_ok());

        config.channels.imu.enabled = true;
        config.imu.capacity = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_mode_flag_on_disabled_channel() {
        let mut config = BridgeConfig::default();
        config.channels.disparity.lr_check = true;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("channels.disparity"), "got: {err}");

        config.channels.disparity.enabled = true;
        assert!(validate(&config).is_ok());
    }
}
