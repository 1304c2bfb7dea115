//! Typed arguments for `zpool(8)`, `zfs(8)` and `zdb(8)`.

use std::path::PathBuf;

use crate::tool_traits::ToolArgs;

/// `zpool create -f -o cachefile=<file> -O compression=on -m none -R <altroot> <pool> [mirror] <vdevs>`
#[derive(Debug, Clone)]
pub struct ZpoolCreate {
    pub pool: String,
    /// Data partitions, e.g. `ada0p2`
    pub vdevs: Vec<String>,
    pub mirror: bool,
    pub cachefile: PathBuf,
    pub altroot: PathBuf,
}

impl ToolArgs for ZpoolCreate {
    fn program(&self) -> &'static str {
        "zpool"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "create".into(),
            "-f".into(),
            "-o".into(),
            format!("cachefile={}", self.cachefile.display()),
            "-O".into(),
            "compression=on".into(),
            "-m".into(),
            "none".into(),
            "-R".into(),
            self.altroot.display().to_string(),
            self.pool.clone(),
        ];
        if self.mirror {
            args.push("mirror".into());
        }
        args.extend(self.vdevs.iter().cloned());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Force-import without mounting any dataset.
#[derive(Debug, Clone)]
pub struct ZpoolImport {
    pub pool: String,
    pub altroot: PathBuf,
}

impl ToolArgs for ZpoolImport {
    fn program(&self) -> &'static str {
        "zpool"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "import".into(),
            "-N".into(),
            "-f".into(),
            "-R".into(),
            self.altroot.display().to_string(),
            self.pool.clone(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ZpoolExport {
    pub pool: String,
}

impl ToolArgs for ZpoolExport {
    fn program(&self) -> &'static str {
        "zpool"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["export".into(), self.pool.clone()]
    }
}

/// `zpool get -H -o value <property> <pool>`
#[derive(Debug, Clone)]
pub struct ZpoolGet {
    pub pool: String,
    pub property: String,
}

impl ToolArgs for ZpoolGet {
    fn program(&self) -> &'static str {
        "zpool"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "get".into(),
            "-H".into(),
            "-o".into(),
            "value".into(),
            self.property.clone(),
            self.pool.clone(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ZpoolSet {
    pub pool: String,
    pub property: String,
    pub value: String,
}

impl ToolArgs for ZpoolSet {
    fn program(&self) -> &'static str {
        "zpool"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "set".into(),
            format!("{}={}", self.property, self.value),
            self.pool.clone(),
        ]
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// `zfs create [-o k=v]... <dataset>`
#[derive(Debug, Clone)]
pub struct ZfsCreate {
    pub dataset: String,
    pub properties: Vec<(String, String)>,
}

impl ToolArgs for ZfsCreate {
    fn program(&self) -> &'static str {
        "zfs"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["create".to_string()];
        for (key, value) in &self.properties {
            args.push("-o".into());
            args.push(format!("{}={}", key, value));
        }
        args.push(self.dataset.clone());
        args
    }

    fn is_destructive(&self) -> bool {
        true
    }
}

/// Dump the vdev labels of a device.
#[derive(Debug, Clone)]
pub struct ZdbLabel {
    pub device: String,
}

impl ToolArgs for ZdbLabel {
    fn program(&self) -> &'static str {
        "zdb"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-l".into(), format!("/dev/{}", self.device)]
    }
}

/// Pool name from `zdb -l` output (`    name: 'freenas-boot'`).
pub fn parse_label_pool_name(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let value = line.trim().strip_prefix("name:")?;
        let name = value.trim().trim_matches('\'');
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Single property value from `zpool get -H -o value`; `-` means unset.
pub fn parse_property_value(output: &str) -> Option<String> {
    let value = output.lines().next()?.trim();
    match value {
        "" | "-" => None,
        v => Some(v.to_string()),
    }
}
