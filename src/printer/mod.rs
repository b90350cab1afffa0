//! Printers: course listings, lesson text (termimad) and run results.

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::course::{Course, CourseDetail, Lesson, Level};
use crate::execution::ExecutionError;
use crate::reconcile::Verdict;

pub struct CoursePrinter;

impl CoursePrinter {
    pub fn level_badge(level: Level) -> String {
        let text = format!("[{}]", level);
        match level {
            Level::Beginner => text.green().to_string(),
            Level::Intermediate => text.yellow().to_string(),
            Level::Advanced => text.red().to_string(),
        }
    }

    pub fn print_list(&self, courses: &[Course]) {
        if courses.is_empty() {
            println!("No courses available.");
            return;
        }
        for c in courses {
            println!("{} {}  {}", c.id.cyan(), c.title.bold(), Self::level_badge(c.level));
            println!(
                "    {} lessons · {}h · {} · {}",
                c.lessons_count, c.duration, c.instructor, c.category
            );
        }
    }

    pub fn print_detail(&self, detail: &CourseDetail) {
        let c = &detail.course;
        println!("{}  {}", c.title.bold(), Self::level_badge(c.level));
        println!("{}", c.description);
        println!("{} · {}h · {}", c.instructor, c.duration, c.category);
        println!();
        for (i, lesson) in detail.lessons.iter().enumerate() {
            println!("{:>3}. {}  {}", i + 1, lesson.title, lesson.id.dimmed());
            if let Some(desc) = lesson.description.as_deref().filter(|d| !d.is_empty()) {
                println!("     {}", desc.dimmed());
            }
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }

    pub fn print_lesson(&self, lesson: &Lesson) {
        self.print(&format!("# {}\n\n{}", lesson.title, lesson.content));
        if !lesson.hints.is_empty() {
            println!("{} {} hint(s) available", "»".yellow(), lesson.hints.len());
        }
        if let Some(expected) = lesson.expectation() {
            println!("{}", "Expected output:".green());
            println!("{}", expected.trim_end());
        }
    }
}

pub struct RunPrinter;

impl RunPrinter {
    pub fn print_error(&self, err: &ExecutionError) {
        eprintln!("{} {}", "error:".red().bold(), err);
    }

    pub fn print_verdict(&self, verdict: Verdict) {
        match verdict {
            Verdict::Match => println!("{} {}", "verdict:".bold(), verdict.green()),
            Verdict::Mismatch => println!("{} {}", "verdict:".bold(), verdict.red()),
            Verdict::NotApplicable => println!("{} {}", "verdict:".bold(), verdict.dimmed()),
        }
    }
}
