// ==========================================
// 运动员名册导入系统 - 命令行入口
// ==========================================
// 用法:
//   roster-import <athletes|measurements> <csv_path> [--commit] [--db <path>] [--by <user>]
//
// 默认只输出预览汇总（JSON）；--commit 时按自动映射提交并输出导入结果
// ==========================================

use anyhow::{anyhow, bail, Context};
use roster_import::api::{CommitRequest, ImportApi, PreviewRequest};
use roster_import::db::get_default_db_path;
use roster_import::{logging, ImportKind};
use serde_json::json;

struct CliArgs {
    kind: ImportKind,
    csv_path: String,
    commit: bool,
    db_path: String,
    created_by: String,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let usage = "usage: roster-import <athletes|measurements> <csv_path> [--commit] [--db <path>] [--by <user>]";

    let kind_arg = args.next().ok_or_else(|| anyhow!(usage))?;
    let kind = ImportKind::parse(&kind_arg).ok_or_else(|| anyhow!("unknown import kind '{}'\n{}", kind_arg, usage))?;
    let csv_path = args.next().ok_or_else(|| anyhow!(usage))?;

    let mut commit = false;
    let mut db_path = None;
    let mut created_by = "cli".to_string();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--commit" => commit = true,
            "--db" => db_path = Some(args.next().ok_or_else(|| anyhow!("--db needs a path"))?),
            "--by" => created_by = args.next().ok_or_else(|| anyhow!("--by needs a user name"))?,
            other => bail!("unexpected argument '{}'\n{}", other, usage),
        }
    }

    Ok(CliArgs {
        kind,
        csv_path,
        commit,
        db_path: db_path.unwrap_or_else(get_default_db_path),
        created_by,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = parse_args()?;

    tracing::info!(
        version = roster_import::VERSION,
        db = %args.db_path,
        kind = %args.kind,
        "roster-import 启动"
    );

    let text = std::fs::read_to_string(&args.csv_path)
        .with_context(|| format!("failed to read {}", args.csv_path))?;
    let api = ImportApi::new(&args.db_path)?;

    let parsed = api.parse_csv(&text, args.kind).await?;
    let preview = api
        .preview(&PreviewRequest {
            kind: args.kind,
            rows: parsed.rows.clone(),
            mapping: parsed.suggested_mappings.clone(),
        })
        .await?;

    let mut output = json!({
        "headers": parsed.headers,
        "suggested_mappings": parsed.suggested_mappings,
        "summary": preview.summary,
    });

    if args.commit {
        let result = api
            .commit(&CommitRequest {
                kind: args.kind,
                rows: parsed.rows,
                mapping: parsed.suggested_mappings,
                review_decisions: Vec::new(),
                created_by: args.created_by,
            })
            .await?;
        output["import_result"] = serde_json::to_value(&result)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
