use crate::util::constants::*;
use crate::util::log;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// The plan to run.
#[derive(Copy, Clone, EnumString, Display, Debug, PartialEq, Eq)]
pub enum PlanSelector {
    /// Generational copying: a bump-pointer nursery over semispaces.
    GenCopy,
    /// Non-moving mark-sweep over segregated free lists.
    MarkSweep,
    /// Ulterior reference counting: a copying nursery in front of a reference counted mature space.
    GenRC,
    /// Reference counting without a nursery.
    RefCount,
}

/// How the heap size is decided.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GCTriggerSelector {
    /// GC is triggered when the heap reaches the given size in bytes.
    FixedHeapSize(usize),
    /// The heap limit moves between the given minimum and maximum (in bytes) based on the live size after each GC.
    DynamicHeapSize(usize, usize),
}

impl GCTriggerSelector {
    const K: u64 = 1024;
    const M: u64 = 1024 * Self::K;
    const G: u64 = 1024 * Self::M;
    const T: u64 = 1024 * Self::G;

    /// The upper bound of the heap, in bytes.
    pub fn max_heap_size(&self) -> usize {
        match self {
            Self::FixedHeapSize(s) => *s,
            Self::DynamicHeapSize(_, s) => *s,
        }
    }

    /// Parse a size such as `4096`, `512K`, `64M` or `1G` into bytes.
    fn parse_size(s: &str) -> Result<usize, String> {
        let re = regex::Regex::new(r"^(?P<size>\d+)(?P<unit>[KkMmGgTt]?)$").map_err(|e| e.to_string())?;
        let caps = re
            .captures(s.trim())
            .ok_or_else(|| format!("Invalid size string: {}", s))?;
        let size: u64 = caps["size"]
            .parse()
            .map_err(|_| format!("Invalid size number: {}", s))?;
        let multiplier = match caps["unit"].to_ascii_uppercase().as_str() {
            "" => 1,
            "K" => Self::K,
            "M" => Self::M,
            "G" => Self::G,
            "T" => Self::T,
            _ => unreachable!(),
        };
        size.checked_mul(multiplier)
            .map(|v| v as usize)
            .ok_or_else(|| format!("Size overflows: {}", s))
    }

    pub fn validate(&self) -> bool {
        match self {
            Self::FixedHeapSize(size) => *size >= BYTES_IN_PAGE,
            Self::DynamicHeapSize(min, max) => *min >= BYTES_IN_PAGE && min <= max,
        }
    }
}

impl FromStr for GCTriggerSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["FixedHeapSize", size] => Ok(Self::FixedHeapSize(Self::parse_size(size)?)),
            ["DynamicHeapSize", sizes] => {
                let sizes: Vec<&str> = sizes.split(',').collect();
                match sizes.as_slice() {
                    [min, max] => Ok(Self::DynamicHeapSize(Self::parse_size(min)?, Self::parse_size(max)?)),
                    _ => Err(format!("DynamicHeapSize needs a minimum and a maximum: {}", s)),
                }
            }
            _ => Err(format!("Unknown GC trigger: {}", s)),
        }
    }
}

/// The heap size used when none is given. Half of the system memory, capped at 64MB.
fn default_heap_size() -> usize {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    let half = (sys.total_memory() / 2) as usize;
    let cap = 64 * BYTES_IN_MBYTE;
    if half < BYTES_IN_MBYTE {
        cap
    } else {
        crate::util::conversions::raw_align_down(half.min(cap), BYTES_IN_PAGE)
    }
}

fn always_valid<T>(_: &T) -> bool {
    true
}

/// The prefix of environment variables that set options, e.g. `ULTERIOR_THREADS=4`.
pub const ENV_PREFIX: &str = "ULTERIOR_";

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Collector options. They are read from the environment when created,
        /// can be changed through [`crate::MMTKBuilder::set_option`], and are
        /// read-only once the collector is initialized.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option from its name and a string value. Returns false
            /// (and keeps the old value) if the value cannot be parsed or is invalid.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_option()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            log::warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        log::warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        log::warn!("Unknown option {}={:?}", s, val);
                        false
                    }
                }
            }

            /// Options with their default values, ignoring the environment.
            pub fn new_without_env_vars() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Apply every `ULTERIOR_`-prefixed environment variable that names an option.
            pub fn read_env_var_settings(&mut self) {
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(ENV_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::new_without_env_vars();
                options.read_env_var_settings();
                options
            }
        }
    ]
}

options! {
    /// The plan to use.
    plan:                    PlanSelector      [always_valid] = PlanSelector::GenRC,
    /// Number of collector threads.
    threads:                 usize             [|v: &usize| *v > 0] = num_cpus::get(),
    /// How the heap size is decided, e.g. `FixedHeapSize:64M` or `DynamicHeapSize:16M,64M`.
    gc_trigger:              GCTriggerSelector [|v: &GCTriggerSelector| v.validate()] = GCTriggerSelector::FixedHeapSize(default_heap_size()),
    /// The nursery budget as a fraction of the heap.
    nursery_fraction:        f64               [|v: &f64| *v > 0.0 && *v < 1.0] = 0.25,
    /// 0 is quiet. 1 logs each GC. 2 and above add per-phase detail.
    verbose:                 usize             [always_valid] = 0,
    /// Collect garbage cycles in reference counting plans.
    cycle_detection:         bool              [always_valid] = true,
    /// Only collect cycles once the purple buffer holds at least this many candidates. 0 means every GC.
    cycle_trigger_threshold: usize             [always_valid] = 0,
    /// Cross-check reference counts against a full trace after every reference counting GC.
    rc_sanity_check:         bool              [always_valid] = false,
    /// Soft time budget (ms) for decrement processing in one GC. 0 means unlimited.
    gc_time_cap:             usize             [always_valid] = 0,
    /// Trigger a GC once the work queues hold more than this many pages.
    meta_data_limit:         usize             [|v: &usize| *v > 0] = 4096,
    /// Should a user-requested GC collect the full heap?
    full_heap_system_gc:     bool              [always_valid] = true,
    /// Should we ignore GCs requested by the user?
    ignore_system_gc:        bool              [always_valid] = false,
}

impl Options {
    pub fn max_heap_pages(&self) -> usize {
        self.gc_trigger.max_heap_size() >> LOG_BYTES_IN_PAGE
    }

    pub fn is_rc_plan(&self) -> bool {
        matches!(self.plan, PlanSelector::GenRC | PlanSelector::RefCount)
    }
}
