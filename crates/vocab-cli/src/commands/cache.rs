//! Permission cache exercise and statistics.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tracing::debug;

use vocab_auth::{Permission, PermissionResolver, RbacEnforcer, Role};
use vocab_core::config::AppConfig;
use vocab_core::error::AppError;
use vocab_core::types::SubjectId;

use crate::output::{self, OutputFormat};

/// Arguments for `cache`
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Role to evaluate
    #[arg(short, long)]
    pub role: Role,
    /// Sweeps over every page and permission
    #[arg(short, long, default_value_t = 2)]
    pub passes: u32,
}

/// Cache counters after the sweeps
#[derive(Debug, Serialize, PartialEq)]
pub struct CacheReport {
    /// Evaluated role
    pub role: Role,
    /// Whether caching is enabled in the configuration
    pub enabled: bool,
    /// Queries issued
    pub queries: u64,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the evaluator
    pub misses: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries dropped on TTL
    pub expirations: u64,
    /// Entries held after the sweeps
    pub size: usize,
    /// `hits / (hits + misses)`
    pub hit_rate: f64,
}

/// Execute `cache`
pub fn execute(args: &CacheArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let report = sweep(&config, args.role, args.passes)?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table if !report.enabled => {
            println!("Permission cache is disabled; {} queries evaluated directly", report.queries);
        }
        OutputFormat::Table => {
            println!("Permission cache for {}", report.role);
            output::print_kv("queries", &report.queries.to_string());
            output::print_kv("hits", &report.hits.to_string());
            output::print_kv("misses", &report.misses.to_string());
            output::print_kv("evictions", &report.evictions.to_string());
            output::print_kv("expirations", &report.expirations.to_string());
            output::print_kv("entries", &report.size.to_string());
            output::print_kv("hit rate", &format!("{:.1}%", report.hit_rate * 100.0));
        }
    }
    Ok(())
}

/// Query every listed page and every permission `passes` times through a
/// resolver built from `config`, then read back its counters.
pub fn sweep(config: &AppConfig, role: Role, passes: u32) -> Result<CacheReport, AppError> {
    let enforcer = Arc::new(RbacEnforcer::from_config(&config.catalog)?);
    let resolver = PermissionResolver::new(enforcer, &config.cache);
    let subject = SubjectId::anonymous();

    let paths: Vec<String> = resolver
        .enforcer()
        .pages()
        .rules()
        .map(|r| r.path.clone())
        .collect();

    let mut queries = 0u64;
    for pass in 0..passes {
        for path in &paths {
            resolver.can_access_page(&subject, role, path);
            queries += 1;
        }
        for &permission in Permission::ALL {
            resolver.has_permission(&subject, role, permission);
            queries += 1;
        }
        debug!(pass, queries, "Cache sweep finished");
    }

    let report = match resolver.metrics() {
        Some(m) => CacheReport {
            role,
            enabled: true,
            queries,
            hits: m.hits,
            misses: m.misses,
            evictions: m.evictions,
            expirations: m.expirations,
            size: m.size,
            hit_rate: m.hit_rate,
        },
        None => CacheReport {
            role,
            enabled: false,
            queries,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            size: 0,
            hit_rate: 0.0,
        },
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_pass_is_served_from_cache() {
        let config = AppConfig::default();
        let first = sweep(&config, Role::Teacher, 1).unwrap();
        assert!(first.enabled);
        assert!(first.misses > 0);

        let twice = sweep(&config, Role::Teacher, 2).unwrap();
        assert_eq!(twice.queries, first.queries * 2);
        assert!(twice.hits >= first.queries);
        assert_eq!(twice.misses, first.misses);
        assert!(twice.hit_rate > first.hit_rate);
    }

    #[test]
    fn test_disabled_cache_reports_nothing_cached() {
        let mut config = AppConfig::default();
        config.cache.enabled = false;
        let report = sweep(&config, Role::Student, 3).unwrap();
        assert!(!report.enabled);
        assert!(report.queries > 0);
        assert_eq!(report.size, 0);
        assert_eq!(report.hits, 0);
    }
}
