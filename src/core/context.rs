//! 给模型的状态摘要
//!
//! 任务较少时全部列出；超过阈值后只列出「焦点任务」（收件箱、高优先级、逾期、即将到期），
//! 其余按项目折叠为计数。项目与分区总是全部列出。

use chrono::NaiveDate;

use crate::backend::{Project, Section, Task};
use crate::config::ContextSection;

/// 收件箱项目：标记为 inbox 或名为 "Inbox"
fn inbox_id(projects: &[Project]) -> Option<&str> {
    projects
        .iter()
        .find(|p| p.is_inbox_project || p.name == "Inbox")
        .map(|p| p.id.as_str())
}

/// 任务是否值得放进摘要
pub fn is_focus_task(task: &Task, inbox: Option<&str>, cfg: &ContextSection, today: NaiveDate) -> bool {
    if cfg.always_show_inbox && inbox == Some(task.project_id.as_str()) {
        return true;
    }
    if task.priority >= cfg.min_priority {
        return true;
    }
    let Some(due) = task
        .due
        .as_ref()
        .and_then(|d| NaiveDate::parse_from_str(&d.date, "%Y-%m-%d").ok())
    else {
        return false;
    };
    let days = (due - today).num_days();
    (cfg.include_overdue && days < 0) || (0..=cfg.due_soon_days).contains(&days)
}

fn project_name<'a>(projects: &'a [Project], id: &str) -> &'a str {
    projects
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.as_str())
        .unwrap_or("Unknown")
}

fn task_line(task: &Task, projects: &[Project]) -> String {
    let due = task.due.as_ref().map(|d| d.string.as_str()).unwrap_or("None");
    format!(
        "ID: {} | Content: {} | Priority: {} | Due: {} | Project: {}",
        task.id,
        task.content,
        task.priority,
        due,
        project_name(projects, &task.project_id)
    )
}

/// 渲染摘要；today 由调用方传入以便测试
pub fn render(
    tasks: &[Task],
    projects: &[Project],
    sections: &[Section],
    cfg: &ContextSection,
    today: NaiveDate,
) -> String {
    let inbox = inbox_id(projects);
    let filtering = tasks.len() > cfg.skip_filter_threshold;

    let mut focus = Vec::new();
    // 保持首次出现的项目顺序
    let mut hidden: Vec<(&str, usize)> = Vec::new();
    for task in tasks {
        if !filtering || is_focus_task(task, inbox, cfg, today) {
            focus.push(task_line(task, projects));
            continue;
        }
        match hidden.iter().position(|(id, _)| *id == task.project_id) {
            Some(i) => hidden[i].1 += 1,
            None => hidden.push((task.project_id.as_str(), 1)),
        }
    }

    let mut project_lines = Vec::new();
    for project in projects {
        project_lines.push(format!("ID: {} | Name: {}", project.id, project.name));
        for section in sections.iter().filter(|s| s.project_id == project.id) {
            project_lines.push(format!("  Section ID: {} | Name: {}", section.id, section.name));
        }
    }

    let focus = if focus.is_empty() {
        "No focus tasks.".to_string()
    } else {
        focus.join("\n")
    };
    let summaries = if hidden.is_empty() {
        "No other tasks.".to_string()
    } else {
        hidden
            .iter()
            .map(|(id, count)| {
                format!(
                    "{}: {count} other tasks hidden (low priority/future)",
                    project_name(projects, id)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "\nCurrent Projects:\n{}\n\nFocus Tasks (Overdue, Due Soon, High Priority, or Inbox):\n{focus}\n\nTask Summaries (Hidden):\n{summaries}\n",
        project_lines.join("\n")
    )
}
