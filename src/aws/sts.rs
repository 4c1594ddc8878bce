use log::debug;
use serde::Deserialize;

use crate::aws::command::AwsCli;

/// Resolve the caller's account id: STS first, `AWS_ACCOUNT_ID` as a
/// fallback for environments without STS access. `None` means live
/// tailing cannot be offered.
pub async fn account_id(aws: &AwsCli) -> Option<String> {
    #[derive(Deserialize)]
    struct Identity {
        #[serde(rename = "Account")]
        account: String,
    }

    match aws.run_json::<Identity>(&["sts", "get-caller-identity"]).await {
        Ok(identity) => Some(identity.account),
        Err(err) => {
            debug!("STS caller identity lookup failed: {err}");
            std::env::var("AWS_ACCOUNT_ID").ok()
        }
    }
}

pub fn build_log_group_arn(region: &str, account_id: &str, group: &str) -> String {
    format!("arn:aws:logs:{region}:{account_id}:log-group:{group}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_log_group_arn() {
        assert_eq!(
            build_log_group_arn("eu-west-1", "123456789012", "/ecs/web"),
            "arn:aws:logs:eu-west-1:123456789012:log-group:/ecs/web"
        );
    }
}
