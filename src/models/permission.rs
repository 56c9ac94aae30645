//! 权限目录
//! 权限级别到显示名称的静态映射，运行期只读

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// 权限级别目录项
#[derive(Debug, Clone, Copy)]
pub struct PermissionLevel {
    pub id: i64,
    pub name: &'static str,
    pub description: &'static str,
}

/// 内置权限级别，与迁移脚本中 permission_levels 的种子数据保持一致
static CATALOG: Lazy<BTreeMap<i64, PermissionLevel>> = Lazy::new(|| {
    [
        PermissionLevel { id: 1, name: "基础用户", description: "基础访问权限" },
        PermissionLevel { id: 2, name: "高级用户", description: "高级访问权限" },
        PermissionLevel { id: 3, name: "管理员", description: "完整管理权限" },
    ]
    .into_iter()
    .map(|level| (level.id, level))
    .collect()
});

/// 查询级别对应的显示名称
/// 未知级别返回合成的 "Level {n}" 标签，永远不会失败
pub fn name_for(level: i64) -> String {
    match CATALOG.get(&level) {
        Some(entry) => entry.name.to_string(),
        None => format!("Level {}", level),
    }
}

/// 目录中是否包含该级别
pub fn is_known(level: i64) -> bool {
    CATALOG.contains_key(&level)
}
