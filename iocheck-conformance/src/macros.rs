/// Declare a module with one `#[test]` per scenario for a driver class.
///
/// ```ignore
/// conformance_suite!(json_io, JsonDriverClass::block_rooted(), DriverProfile::default());
/// ```
///
/// The config defaults to [`HarnessConfig::from_env`](crate::HarnessConfig::from_env);
/// pass a fourth argument to override it. Skipped scenarios log their reason
/// and pass; failures panic with the fixture, lazy flag and cause.
#[macro_export]
macro_rules! conformance_suite {
    ($name:ident, $class:expr, $profile:expr $(,)?) => {
        $crate::conformance_suite!($name, $class, $profile, $crate::HarnessConfig::from_env());
    };
    ($name:ident, $class:expr, $profile:expr, $config:expr $(,)?) => {
        mod $name {
            #[allow(unused_imports)]
            use super::*;

            fn run(scenario: $crate::Scenario) {
                let suite = $crate::ConformanceSuite::new($class, $profile, $config);
                $crate::run_scenario_or_panic(&suite, scenario);
            }

            #[test]
            fn test_write_then_read() {
                run($crate::Scenario::WriteThenRead);
            }

            #[test]
            fn test_read_then_write() {
                run($crate::Scenario::ReadThenWrite);
            }

            #[test]
            fn test_read_objects_are_compliant() {
                run($crate::Scenario::ReadObjectsAreCompliant);
            }

            #[test]
            fn test_lazy_read_is_compliant() {
                run($crate::Scenario::LazyReadIsCompliant);
            }

            #[test]
            fn test_load_lazy_objects() {
                run($crate::Scenario::LoadLazyObjects);
            }

            #[test]
            fn test_read_is_idempotent() {
                run($crate::Scenario::ReadIsIdempotent);
            }
        }
    };
}
