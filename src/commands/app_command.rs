use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Demo,
    Entities,
    Entity { id: i32 },
    Rows { entity_id: i32 },
    Charts,
    ChartShow { id: i32 },
    ChartDelete { id: i32 },
    ChartImport { path: String },
    Report { entity_id: i32, group: String },
    ReportGlobal { group: String },
    Help,
    Unknown(String),
}

pub const HELP: &str = "\
用法:
  demo                          写入 Job/Company 示例数据和图表
  entities                      列出实体
  entity <id>                   查看实体定义
  rows <entity_id>              列出实体的行
  charts                        列出所有图表配置
  chart show <id>               查看图表配置
  chart delete <id>             删除图表配置
  chart import <file.json>      导入图表配置（单个对象或数组）
  report <entity_id> <group>    计算实体在 group 下的图表
  report global <group>         计算 group 级图表
  help                          显示帮助";

fn parse_id(tok: Option<&&str>) -> Option<i32> {
    tok.and_then(|s| s.parse::<i32>().ok())
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Help);
        }

        match parts[0] {
            "demo" => Ok(AppCommand::Demo),
            "entities" => Ok(AppCommand::Entities),
            "entity" => match parse_id(parts.get(1)) {
                Some(id) => Ok(AppCommand::Entity { id }),
                None => Ok(AppCommand::Unknown("用法: entity <id>".to_string())),
            },
            "rows" => match parse_id(parts.get(1)) {
                Some(entity_id) => Ok(AppCommand::Rows { entity_id }),
                None => Ok(AppCommand::Unknown("用法: rows <entity_id>".to_string())),
            },
            "charts" => Ok(AppCommand::Charts),
            "chart" => match (parts.get(1).copied(), parts.get(2)) {
                (Some("show"), id) => match parse_id(id) {
                    Some(id) => Ok(AppCommand::ChartShow { id }),
                    None => Ok(AppCommand::Unknown("用法: chart show <id>".to_string())),
                },
                (Some("delete"), id) => match parse_id(id) {
                    Some(id) => Ok(AppCommand::ChartDelete { id }),
                    None => Ok(AppCommand::Unknown("用法: chart delete <id>".to_string())),
                },
                (Some("import"), Some(_)) => Ok(AppCommand::ChartImport {
                    path: parts[2..].join(" "),
                }),
                _ => Ok(AppCommand::Unknown(
                    "用法: chart show <id> | chart delete <id> | chart import <file.json>"
                        .to_string(),
                )),
            },
            "report" => match (parts.get(1).copied(), parts.get(2)) {
                (Some("global"), Some(group)) => Ok(AppCommand::ReportGlobal {
                    group: group.to_string(),
                }),
                (Some(id), Some(group)) => match id.parse::<i32>() {
                    Ok(entity_id) => Ok(AppCommand::Report {
                        entity_id,
                        group: group.to_string(),
                    }),
                    Err(_) => Ok(AppCommand::Unknown(
                        "用法: report <entity_id> <group> | report global <group>".to_string(),
                    )),
                },
                _ => Ok(AppCommand::Unknown(
                    "用法: report <entity_id> <group> | report global <group>".to_string(),
                )),
            },
            "help" | "-h" | "--help" => Ok(AppCommand::Help),
            other => Ok(AppCommand::Unknown(format!("未知命令: {other}"))),
        }
    }
}
