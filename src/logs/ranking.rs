use std::collections::BTreeSet;

const MAX_RESULTS: usize = 10;

const SUFFIX_SCORE: u32 = 100;
const CONTAINS_SCORE: u32 = 40;
const TOKEN_SCORE: u32 = 10;
const ECS_PREFIX_BONUS: u32 = 5;

/// Rank candidate log group names by how likely they are to belong to the
/// given cluster/container (and optionally service/family), best first.
///
/// Each lookup value contributes independently: an exact `/name` suffix
/// match outweighs plain substring containment, and shared alphanumeric
/// tokens add a little on top. Names under the `/ecs` prefix convention
/// get a one-time bonus. Candidates scoring zero are dropped, ties break
/// lexicographically, and at most ten names are returned.
pub fn rank_log_groups(
    candidates: &[String],
    cluster: &str,
    container: &str,
    service: Option<&str>,
    family: Option<&str>,
) -> Vec<String> {
    let mut scored: Vec<(u32, &String)> = candidates
        .iter()
        .filter_map(|name| {
            let score = score_group(name, cluster, container, service, family);
            (score > 0).then_some((score, name))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, name)| name.clone())
        .collect()
}

fn score_group(
    name: &str,
    cluster: &str,
    container: &str,
    service: Option<&str>,
    family: Option<&str>,
) -> u32 {
    let name_lower = name.to_lowercase();
    let mut score = 0;

    for target in [Some(cluster), Some(container), service, family]
        .into_iter()
        .flatten()
    {
        score += score_against(&name_lower, target);
    }

    if name_lower.starts_with("/ecs") {
        score += ECS_PREFIX_BONUS;
    }

    score
}

fn score_against(name_lower: &str, target: &str) -> u32 {
    let target_lower = target.trim().to_lowercase();
    if target_lower.is_empty() {
        return 0;
    }

    let mut score = 0;
    if name_lower.ends_with(&format!("/{target_lower}")) {
        score += SUFFIX_SCORE;
    } else if name_lower.contains(&target_lower) {
        score += CONTAINS_SCORE;
    }

    let name_tokens = tokens(name_lower);
    let target_tokens = tokens(&target_lower);
    score += TOKEN_SCORE * name_tokens.intersection(&target_tokens).count() as u32;

    score
}

fn tokens(value: &str) -> BTreeSet<&str> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_exact_suffix_beats_substring_match() {
        let candidates = groups(&["/ecs/production-web-backup", "/ecs/production-web"]);
        let ranked = rank_log_groups(&candidates, "production-web", "container", None, None);
        assert_eq!(
            ranked,
            vec![
                "/ecs/production-web".to_string(),
                "/ecs/production-web-backup".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_lookups_leave_only_the_ecs_bonus() {
        let candidates = groups(&["/ecs/web", "/aws/lambda/other", "unrelated"]);
        let ranked = rank_log_groups(&candidates, "", "", None, None);
        assert_eq!(ranked, vec!["/ecs/web".to_string()]);
    }

    #[test]
    fn test_zero_scoring_candidates_are_excluded() {
        let candidates = groups(&["/aws/rds/instance", "/ecs/web"]);
        let ranked = rank_log_groups(&candidates, "web", "app", None, None);
        assert_eq!(ranked, vec!["/ecs/web".to_string()]);
    }

    #[test]
    fn test_service_and_family_contribute_when_given() {
        let candidates = groups(&["/custom/orders-api", "/custom/billing-api"]);
        let ranked = rank_log_groups(&candidates, "main", "app", Some("orders-api"), None);
        assert_eq!(ranked[0], "/custom/orders-api");
    }

    #[test]
    fn test_results_capped_at_ten() {
        let candidates: Vec<String> = (0..15).map(|i| format!("/ecs/cluster-{i:02}")).collect();
        let ranked = rank_log_groups(&candidates, "cluster", "app", None, None);
        assert_eq!(ranked.len(), 10);
    }

    #[test]
    fn test_ties_break_lexicographically() {
        let candidates = groups(&["/ecs/beta", "/ecs/alpha"]);
        let ranked = rank_log_groups(&candidates, "", "", None, None);
        assert_eq!(ranked, vec!["/ecs/alpha".to_string(), "/ecs/beta".to_string()]);
    }

    #[test]
    fn test_token_overlap_is_case_insensitive() {
        let candidates = groups(&["/custom/Payment-Service"]);
        let ranked = rank_log_groups(&candidates, "payment", "service", None, None);
        assert_eq!(ranked.len(), 1);
    }
}
