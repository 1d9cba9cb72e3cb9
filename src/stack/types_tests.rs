//! Tests for stack result types

#[cfg(test)]
mod types_tests {
    use super::super::*;
    use proptest::prelude::*;
    use std::path::Path;

    #[test]
    fn test_classify_all_services_up() {
        assert_eq!(DeploymentStatus::classify(3, 3), DeploymentStatus::Success);
    }

    #[test]
    fn test_classify_partial() {
        assert_eq!(
            DeploymentStatus::classify(4, 2),
            DeploymentStatus::PartialFailure
        );
    }

    #[test]
    fn test_classify_nothing_running() {
        assert_eq!(
            DeploymentStatus::classify(4, 0),
            DeploymentStatus::DeploymentFailed
        );
    }

    #[test]
    fn test_classify_no_declared_services() {
        assert_eq!(
            DeploymentStatus::classify(0, 0),
            DeploymentStatus::DeploymentFailed
        );
    }

    #[test]
    fn test_teardown_failure_overrides_success_only() {
        assert_eq!(
            DeploymentStatus::Success.after_teardown(false),
            DeploymentStatus::CleanupFailed
        );
        assert_eq!(
            DeploymentStatus::DeploymentFailed.after_teardown(false),
            DeploymentStatus::DeploymentFailed
        );
        assert_eq!(
            DeploymentStatus::PartialFailure.after_teardown(false),
            DeploymentStatus::PartialFailure
        );
        assert_eq!(
            DeploymentStatus::Success.after_teardown(true),
            DeploymentStatus::Success
        );
    }

    #[test]
    fn test_deployment_status_display() {
        assert_eq!(DeploymentStatus::Success.to_string(), "SUCCESS");
        assert_eq!(DeploymentStatus::CleanupFailed.to_string(), "CLEANUP_FAILED");
    }

    #[test]
    fn test_deployment_status_serialize() {
        let json = serde_json::to_string(&DeploymentStatus::PartialFailure).unwrap();
        assert_eq!(json, r#""partial_failure""#);
    }

    #[test]
    fn test_config_missing_lists_paths() {
        let result = ValidationResult::config_missing(
            "basic-stack",
            &[Path::new("/srv/.config/basic-stack/config.yml")],
        );
        assert!(!result.passed);
        assert_eq!(result.issue, Some(StackIssue::ConfigMissing));
        assert_eq!(result.stage, ValidationStage::SyntaxCheck);
        assert!(result.messages[0].contains("config.yml"));
        assert!(!result.allows_deployment());
    }

    #[test]
    fn test_consistency_warning_still_allows_deployment() {
        let result = ValidationResult::fail(
            "mcp",
            ValidationStage::ServiceConsistency,
            StackIssue::ServiceConsistencyWarning,
            vec![],
        );
        assert!(result.allows_deployment());
    }

    #[test]
    fn test_validation_result_skips_empty_issue() {
        let result = ValidationResult::pass("mcp", ValidationStage::ServiceConsistency, vec![]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("issue"));
    }

    #[test]
    fn test_stack_error_tool_unavailable() {
        let err = StackError::ToolUnavailable {
            tool: "docker compose".to_string(),
            reason: "not found".to_string(),
        };
        assert!(err.to_string().contains("docker compose"));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_exec_error_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ExecError::spawn("docker", &io);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("docker"));
    }

    proptest! {
        #[test]
        fn classify_success_iff_everything_runs(expected in 0u32..50, up in 0u32..50) {
            let status = DeploymentStatus::classify(expected, up);
            prop_assert_eq!(status.is_success(), expected > 0 && up >= expected);
            if up > 0 && up < expected {
                prop_assert_eq!(status, DeploymentStatus::PartialFailure);
            }
        }
    }
}
