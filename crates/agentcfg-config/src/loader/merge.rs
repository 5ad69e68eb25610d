//! Settings merging logic
//!
//! Merges settings from multiple sources with proper precedence.

use crate::types::*;

/// Merge two settings values, with `overlay` taking precedence
///
/// Fields of `overlay` that still hold their default value do not override `base`.
pub fn merge(mut base: Settings, overlay: Settings) -> Settings {
    base.cache = merge_cache(base.cache, overlay.cache);
    base.validation = merge_validation(base.validation, overlay.validation);
    base.optimization = merge_optimization(base.optimization, overlay.optimization);
    base.logging = merge_logging(base.logging, overlay.logging);
    base
}

/// Pick `overlay` when it differs from the default, else keep `base`
fn pick<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
    if overlay != *default {
        overlay
    } else {
        base
    }
}

fn merge_cache(base: CacheSettings, overlay: CacheSettings) -> CacheSettings {
    let default = CacheSettings::default();
    CacheSettings {
        config_ttl_secs: pick(
            base.config_ttl_secs,
            overlay.config_ttl_secs,
            &default.config_ttl_secs,
        ),
        validation_ttl_secs: pick(
            base.validation_ttl_secs,
            overlay.validation_ttl_secs,
            &default.validation_ttl_secs,
        ),
        optimization_ttl_secs: pick(
            base.optimization_ttl_secs,
            overlay.optimization_ttl_secs,
            &default.optimization_ttl_secs,
        ),
        max_entries: pick(base.max_entries, overlay.max_entries, &default.max_entries),
        history_limit: pick(
            base.history_limit,
            overlay.history_limit,
            &default.history_limit,
        ),
    }
}

fn merge_validation(base: ValidationSettings, overlay: ValidationSettings) -> ValidationSettings {
    let default = ValidationSettings::default();
    ValidationSettings {
        mode: pick(base.mode, overlay.mode, &default.mode),
        generate_fallback: pick(
            base.generate_fallback,
            overlay.generate_fallback,
            &default.generate_fallback,
        ),
        abort_early: pick(base.abort_early, overlay.abort_early, &default.abort_early),
    }
}

fn merge_optimization(
    base: OptimizationSettings,
    overlay: OptimizationSettings,
) -> OptimizationSettings {
    let default = OptimizationSettings::default();
    OptimizationSettings {
        enabled: pick(base.enabled, overlay.enabled, &default.enabled),
        mode: pick(base.mode, overlay.mode, &default.mode),
        profile: overlay.profile.or(base.profile),
        apply_manual: pick(base.apply_manual, overlay.apply_manual, &default.apply_manual),
    }
}

fn merge_logging(base: LoggingSettings, overlay: LoggingSettings) -> LoggingSettings {
    let default = LoggingSettings::default();
    LoggingSettings {
        level: pick(base.level, overlay.level, &default.level),
    }
}
