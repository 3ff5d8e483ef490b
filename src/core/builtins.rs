// src/core/builtins.rs

//! # Built-in properties
//!
//! Registers every built-in property of a template context, by category.

use crate::constants::{
    CONFIG_CATEGORY, CONFIG_PREFIX, CONTROL_FLOW_CATEGORY, ENV_PREFIX, ENVIRONMENT_CATEGORY,
    FILE_CATEGORY, LINE_SEPARATOR, MISC_CATEGORY, OPERATOR_CATEGORY, PATH_SEPARATOR,
    PROCESS_SEPARATOR, SYSTEM_CATEGORY,
};
use crate::core::{
    attributes::AttributeSpec,
    control_flow, files,
    kinds::ComputedKind,
    operators,
    options::OptionStore,
    property::{Property, PropertyError, PropertyRef, error_value},
    property_maps::PropertyMaps,
    xml,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Options that always have a `config.*` property, even when unset.
const JVM_OPTIONS: [&str; 4] = [
    "master.jvm.xmx",
    "master.jvm.args",
    "slave.jvm.xmx",
    "slave.jvm.args",
];

/// Registers every built-in property into `maps`.
pub fn register(maps: &mut PropertyMaps) -> Result<(), PropertyError> {
    for property in environment()? {
        maps.set_property(ENVIRONMENT_CATEGORY, property);
    }
    for property in system()? {
        maps.set_property(SYSTEM_CATEGORY, property);
    }
    register_config(maps)?;

    for property in files::properties(&maps.workspace())? {
        maps.set_property(FILE_CATEGORY, property);
    }
    for property in misc()? {
        maps.set_property(MISC_CATEGORY, property);
    }
    for property in operators::properties()? {
        maps.set_property(OPERATOR_CATEGORY, property);
    }
    for property in control_flow::properties()? {
        maps.set_property(CONTROL_FLOW_CATEGORY, property);
    }
    Ok(())
}

// --- ENVIRONMENT & SYSTEM ---

fn environment() -> Result<Vec<PropertyRef>, PropertyError> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            let help = format!("The value of the environment variable {}.", name);
            Property::constant(format!("{}{}", ENV_PREFIX, name), value, help)
        })
        .collect()
}

fn system() -> Result<Vec<PropertyRef>, PropertyError> {
    let home = dirs::home_dir()
        .map(|home| dunce::simplified(&home).display().to_string())
        .unwrap_or_default();

    Ok(vec![
        Property::constant("os.name", std::env::consts::OS, "The operating system.")?,
        Property::constant("os.arch", std::env::consts::ARCH, "The CPU architecture.")?,
        Property::constant(
            "os.family",
            std::env::consts::FAMILY,
            "The operating system family (unix or windows).",
        )?,
        Property::constant(
            "path.separator",
            PATH_SEPARATOR,
            "The separator of path lists.",
        )?,
        Property::constant(
            "file.separator",
            std::path::MAIN_SEPARATOR_STR,
            "The separator of path components.",
        )?,
        Property::constant("line.separator", LINE_SEPARATOR, "The line separator.")?,
        Property::constant(
            "process.separator",
            PROCESS_SEPARATOR,
            "The separator of the commands of a process chain.",
        )?,
        Property::constant("user.home", home, "The home directory of the user.")?,
        Property::new(
            "user.dir",
            "The current working directory.",
            ComputedKind::eager(Vec::new(), |_, _| {
                Ok(std::env::current_dir()
                    .map(|dir| dunce::simplified(&dir).display().to_string())
                    .unwrap_or_default())
            }),
        )?,
        Property::new(
            "current.time.millis",
            "Milliseconds since the Unix epoch.",
            ComputedKind::eager(Vec::new(), |_, _| {
                Ok(SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_millis().to_string())
                    .unwrap_or_default())
            }),
        )?,
    ])
}

// --- CONFIG ---

/// The cached `config.<name>` property of one configuration option.
pub fn config_property(name: &str, options: OptionStore) -> Result<PropertyRef, PropertyError> {
    let option = name.to_string();
    Property::new(
        format!("{}{}", CONFIG_PREFIX, name),
        format!("The value of the configuration option {}.", name),
        ComputedKind::cached(Vec::new(), move |_, _| {
            Ok(options.get(&option).unwrap_or_default())
        }),
    )
}

/// `-Xmx<heap>` unless the heap is empty or `default`, followed by the arguments.
fn combine_jvm_args(heap: &str, args: &str) -> String {
    let heap = heap.trim();
    let args = args.trim();
    let mut parts = Vec::new();
    if !heap.is_empty() && !heap.eq_ignore_ascii_case("default") {
        parts.push(format!("-Xmx{}", heap));
    }
    if !args.is_empty() {
        parts.push(args.to_string());
    }
    parts.join(" ")
}

fn combined_property(
    maps: &PropertyMaps,
    prefix: &str,
) -> Result<PropertyRef, PropertyError> {
    let heap_name = format!("{}{}.jvm.xmx", CONFIG_PREFIX, prefix);
    let args_name = format!("{}{}.jvm.args", CONFIG_PREFIX, prefix);

    let (heap_input, args_input) = (heap_name.clone(), args_name.clone());
    let combined = Property::new(
        format!("{}{}.jvm.args.combined", CONFIG_PREFIX, prefix),
        format!("The -Xmx heap setting and the arguments of the {} JVM.", prefix),
        ComputedKind::cached(Vec::new(), move |property, context| {
            let (Some(heap), Some(args)) = (
                context.get_property(&heap_input),
                context.get_property(&args_input),
            ) else {
                return Ok(error_value(property.name()));
            };
            let heap = heap.get_current(context)?;
            let args = args.get_current(context)?;
            Ok(combine_jvm_args(&heap, &args))
        }),
    )?;

    for input in [heap_name, args_name] {
        if let Some(input) = maps.get_property(&input) {
            combined.listen_to_invalidates_of(&input)?;
        }
    }
    Ok(combined)
}

/// Registers `config.<name>` for every option of `maps` plus the combined JVM
/// arguments, replacing existing ones.
pub(crate) fn register_config(maps: &mut PropertyMaps) -> Result<(), PropertyError> {
    let options = maps.options().clone();
    let mut names = options.names();
    names.extend(JVM_OPTIONS.iter().map(|name| name.to_string()));
    names.sort();
    names.dedup();

    for name in names {
        maps.set_property(CONFIG_CATEGORY, config_property(&name, options.clone())?);
    }
    for prefix in ["master", "slave"] {
        let combined = combined_property(maps, prefix)?;
        maps.set_property(CONFIG_CATEGORY, combined);
    }
    Ok(())
}

// --- MISC ---

fn misc() -> Result<Vec<PropertyRef>, PropertyError> {
    Ok(vec![
        Property::new(
            "echo",
            "Returns text.",
            ComputedKind::eager(vec![AttributeSpec::required("text")], |property, _| {
                Ok(property
                    .attributes()
                    .value("text")
                    .map_or_else(|| error_value(property.name()), str::to_string))
            }),
        )?,
        files::tmpfile()?,
        xml::xml_in()?,
    ])
}
