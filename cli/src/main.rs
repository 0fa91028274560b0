use clap::Parser;
use clap_derive::Parser;
use config::{PathManager, load_env_file};
use scribe_core::chat::{ChatEvent, ChatSession};
use scribe_core::content::{
    self, AUTHORSHIP_OPTIONS, COMPREHENSION_OPTIONS, COMPREHENSION_QUESTION, LikertBlock,
};
use scribe_core::document::TelemetryEvent;
use scribe_core::storage::{FileStorage, MemoryStorage, SharedStorage};
use scribe_core::store::{SharedStore, SurveyStore};
use scribe_core::wizard::{Advance, MIN_SENTENCES, Stage, StepWizard};
use scribe_core::{Autosave, Finalizer, HttpBackend, ParticipantSession, text, timer::ActiveTimer};
use serde_json::{Map, Value, json};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal runner for the scribe writing study", long_about = None)]
struct Args {
    /// Base URL of the survey backend
    #[arg(long, env = "SCRIBE_SERVER_URL", default_value = "http://localhost:3001")]
    server: String,

    /// Named session to resume (state is kept on disk per session)
    #[arg(long, default_value = "default")]
    session: String,

    /// Keep all state in memory (nothing survives exit)
    #[arg(long)]
    ephemeral: bool,

    #[arg(long, short)]
    tracing: bool,
}

fn setup_tracing(enable: bool) {
    if enable {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::TRACE)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::ERROR)
            .with_writer(|| std::io::sink())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    }
}

fn print_stage_bar(stage: Stage) {
    let terminal_width: usize = 80;
    let status = format!(" {}/9 • {} ", stage.index() + 1, stage.title());
    let padding = terminal_width.saturating_sub(status.chars().count() + 2);
    let left_pad = padding / 2;
    let right_pad = padding - left_pad;

    println!("┌{}┐", "─".repeat(terminal_width - 2));
    println!("│{}{}{}│", " ".repeat(left_pad), status, " ".repeat(right_pad));
    println!("└{}┘", "─".repeat(terminal_width - 2));
}

/// Read one trimmed line; None on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(_) => None,
    }
}

fn read_choice(prompt: &str, max: usize) -> Option<usize> {
    loop {
        let line = read_line(prompt)?;
        match line.parse::<usize>() {
            Ok(n) if (1..=max).contains(&n) => return Some(n),
            _ => println!("請輸入 1 到 {} 之間的數字。", max),
        }
    }
}

struct App {
    storage: SharedStorage,
    store: SharedStore,
    backend: Arc<HttpBackend>,
    wizard: StepWizard,
}

impl App {
    fn autosave(&self) -> Autosave {
        Autosave::new(self.storage.clone(), self.backend.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_tracing(args.tracing);
    load_env_file();

    let storage: SharedStorage = if args.ephemeral {
        Arc::new(Mutex::new(MemoryStorage::new()))
    } else {
        PathManager::ensure_dirs_exist()?;
        let dir = PathManager::sessions_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine session directory"))?
            .join(&args.session);
        Arc::new(Mutex::new(FileStorage::new(dir)?))
    };

    let store = SurveyStore::shared(storage.clone());
    let backend = Arc::new(HttpBackend::new(&args.server));
    let mut app = App {
        storage,
        store,
        backend,
        wizard: StepWizard::new(),
    };

    println!("scribe 寫作研究（輸入 Ctrl+D 可隨時離開）");
    println!();

    loop {
        let stage = app.wizard.stage();
        print_stage_bar(stage);

        let done = match stage {
            Stage::Consent => run_consent(&mut app).await,
            Stage::Baseline => run_likert(&mut app, content::BASELINE_BLOCKS, None),
            Stage::Instruction => run_instruction(&mut app),
            Stage::Task => run_task(&mut app).await,
            Stage::PostTaskA => {
                let order = content::post_a_order(&app.storage);
                run_likert(&mut app, content::POST_A_BLOCKS, Some(order))
            }
            Stage::PostTaskB => run_likert(&mut app, content::POST_B_BLOCKS, None),
            Stage::Authorship => run_authorship(&mut app),
            Stage::Demographics => run_demographics(&mut app),
            Stage::Debrief => run_debrief(&mut app).await,
        };

        match done {
            StageOutcome::Advance => {
                let outcome = {
                    let guard = app.store.lock().unwrap();
                    app.wizard.advance(guard.document())
                };
                match outcome {
                    Advance::Moved(next) => {
                        app.store.lock().unwrap().log_event(TelemetryEvent::with_meta(
                            "stage_advance",
                            json!({ "stage": next.index() + 1 }),
                        ));
                        println!();
                    }
                    Advance::Incomplete { missing, first } => {
                        println!("尚有 {} 項未完成：{}", missing.len(), missing.join(", "));
                        if let Some(first) = first {
                            println!("請先完成：{}", first);
                        }
                        println!();
                    }
                    Advance::AtEnd => break,
                }
            }
            StageOutcome::Back => {
                app.wizard.retreat();
                println!();
            }
            StageOutcome::Quit => break,
        }
    }

    println!("感謝參與！");
    Ok(())
}

enum StageOutcome {
    Advance,
    Back,
    Quit,
}

async fn run_consent(app: &mut App) -> StageOutcome {
    println!("本研究將請您完成問卷與一項寫作任務，過程中可使用 AI 寫作助手。");
    println!("所有資料僅供學術研究使用。");
    loop {
        let Some(line) = read_line("是否同意參與本研究？(y/n) > ") else {
            return StageOutcome::Quit;
        };
        match line.as_str() {
            "y" | "Y" | "yes" => {
                // The participant record is created as soon as consent is
                // given, so later autosaves have somewhere to land. Without
                // it nothing gets recorded, so a failure keeps the user
                // here to retry rather than moving on.
                let session = ParticipantSession::new(app.storage.clone(), app.backend.clone());
                match session.ensure_participant().await {
                    Ok(id) => {
                        app.wizard.consent_agreed = true;
                        println!("已建立參與者：{}", id);
                        return StageOutcome::Advance;
                    }
                    Err(e) => {
                        println!("無法連線伺服器：{}", e);
                        println!("請確認後端已啟動，然後再試一次。");
                    }
                }
            }
            "n" | "N" | "no" => {
                println!("已取消，感謝您的時間。");
                return StageOutcome::Quit;
            }
            _ => println!("請輸入 y 或 n。"),
        }
    }
}

fn run_likert(
    app: &mut App,
    blocks: &'static [LikertBlock],
    order: Option<Vec<usize>>,
) -> StageOutcome {
    println!("請依同意程度作答（1 = 非常不同意，7 = 非常同意，b = 上一頁）");
    let autosave = app.autosave();

    let indices: Vec<usize> = order.unwrap_or_else(|| (0..blocks.len()).collect());
    for block_index in indices {
        let block = &blocks[block_index];
        println!();
        println!("— {} —", block.title);
        for item in block.items {
            let answered = app
                .store
                .lock()
                .unwrap()
                .document()
                .likert
                .get(item.id)
                .copied();
            let prompt = match answered {
                Some(v) => format!("{} [目前：{}] > ", item.stem, v),
                None => format!("{} > ", item.stem),
            };
            loop {
                let Some(line) = read_line(&prompt) else {
                    return StageOutcome::Quit;
                };
                if line == "b" {
                    return StageOutcome::Back;
                }
                if line.is_empty() && answered.is_some() {
                    break;
                }
                match line.parse::<u8>() {
                    Ok(v) if app.store.lock().unwrap().set_likert(item.id, v) => {
                        autosave.sync_field(item.id, json!(v));
                        break;
                    }
                    _ => println!("請輸入 1 到 7。"),
                }
            }
        }
    }
    StageOutcome::Advance
}

fn run_instruction(app: &mut App) -> StageOutcome {
    println!("接下來請撰寫一則短篇故事（至少 {} 句）。", MIN_SENTENCES);
    println!("寫作期間可隨時向 AI 助手提問，是否採用其建議完全由您決定。");
    println!();
    println!("{}", COMPREHENSION_QUESTION);
    for (i, option) in COMPREHENSION_OPTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    let Some(choice) = read_choice("> ", COMPREHENSION_OPTIONS.len()) else {
        return StageOutcome::Quit;
    };
    app.wizard.comprehension_answer = Some(choice - 1);
    StageOutcome::Advance
}

async fn run_task(app: &mut App) -> StageOutcome {
    println!("請開始寫作。每行輸入會加入故事；指令：");
    println!("  /ai <問題>   詢問 AI 助手");
    println!("  /show        顯示目前的故事");
    println!("  /done        完成並送出");

    {
        let mut guard = app.store.lock().unwrap();
        guard.mark_task_started();
        guard.log_event(TelemetryEvent::new("task_focus"));
    }
    let mut timer = ActiveTimer::new();
    timer.focus();

    let mut chat = ChatSession::new(
        app.store.clone(),
        app.storage.clone(),
        app.backend.clone(),
    );
    let mut events = chat.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = events.recv().await {
            match event {
                ChatEvent::Reasoning => {
                    print!("助手：");
                    io::stdout().flush().ok();
                }
                ChatEvent::Typing(shown) => {
                    let chars: Vec<char> = shown.chars().collect();
                    let delta: String = chars[printed..].iter().collect();
                    print!("{}", delta);
                    io::stdout().flush().ok();
                    printed = chars.len();
                }
                ChatEvent::Completed { .. } => {
                    println!();
                    printed = 0;
                }
            }
        }
    });

    let outcome = loop {
        timer.tick(&app.store);
        let Some(line) = read_line("> ") else {
            break StageOutcome::Quit;
        };
        if line.is_empty() {
            continue;
        }
        if let Some(prompt) = line.strip_prefix("/ai ") {
            app.store.lock().unwrap().log_event(TelemetryEvent::with_meta(
                "chat_prompt",
                json!({ "chars": prompt.trim().chars().count() }),
            ));
            if let Err(e) = chat.send(prompt).await {
                println!("（{}）", e);
            }
            continue;
        }
        match line.as_str() {
            "/show" => {
                let guard = app.store.lock().unwrap();
                println!("{}", guard.document().writing.story_text);
            }
            "/done" => {
                let sentences = {
                    let guard = app.store.lock().unwrap();
                    text::count_sentences(&guard.document().writing.story_text)
                };
                if sentences < MIN_SENTENCES {
                    println!("故事目前 {} 句，至少需要 {} 句。", sentences, MIN_SENTENCES);
                    continue;
                }
                submit_story(app, &mut timer);
                break StageOutcome::Advance;
            }
            _ => {
                let mut guard = app.store.lock().unwrap();
                let mut text = guard.document().writing.story_text.clone();
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&line);
                guard.set_story_text(text);
            }
        }
    };

    chat.flush().await;
    printer.abort();
    outcome
}

fn submit_story(app: &mut App, timer: &mut ActiveTimer) {
    timer.blur(&app.store);
    app.store
        .lock()
        .unwrap()
        .log_event(TelemetryEvent::new("task_blur"));

    let payload: Map<String, Value> = {
        let mut guard = app.store.lock().unwrap();
        guard.update(|doc| {
            doc.writing.submitted_at = Some(scribe_core::document::unix_millis());
            doc.writing.sentence_count = Some(text::count_sentences(&doc.writing.story_text));
            doc.writing.word_count = Some(text::count_words(&doc.writing.story_text));
        });
        let doc = guard.document();
        let mut payload = Map::new();
        payload.insert("story_text".to_string(), json!(doc.writing.story_text));
        payload.insert("sentence_count".to_string(), json!(doc.writing.sentence_count));
        payload.insert("word_count".to_string(), json!(doc.writing.word_count));
        payload.insert(
            "task_page_elapsed_ms".to_string(),
            json!(doc.writing.elapsed_ms),
        );
        payload.insert(
            "ai_chat_log".to_string(),
            json!(serde_json::to_string(&doc.chat).unwrap_or_default()),
        );
        payload
    };
    app.autosave().sync_block(payload);
    println!("故事已送出。");
}

fn run_authorship(app: &mut App) -> StageOutcome {
    println!("若要發表這篇故事，您會如何署名？");
    for (i, option) in AUTHORSHIP_OPTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    let Some(choice) = read_choice("> ", AUTHORSHIP_OPTIONS.len()) else {
        return StageOutcome::Quit;
    };
    let Some(reason) = read_line("請簡述您的理由 > ") else {
        return StageOutcome::Quit;
    };

    app.store.lock().unwrap().update(|doc| {
        doc.authorship.value = Some(choice as u8);
        doc.authorship.reason = reason.clone();
    });
    let mut payload = Map::new();
    payload.insert("authorship_label".to_string(), json!(choice));
    payload.insert("authorship_reason".to_string(), json!(reason));
    app.autosave().sync_block(payload);
    StageOutcome::Advance
}

fn run_demographics(app: &mut App) -> StageOutcome {
    let Some(age_group) = read_line("年齡層（例如 18-24）> ") else {
        return StageOutcome::Quit;
    };
    let Some(gender) = read_line("性別 > ") else {
        return StageOutcome::Quit;
    };
    let Some(education_level) = read_line("教育程度 > ") else {
        return StageOutcome::Quit;
    };
    let Some(email) = read_line("電子郵件 > ") else {
        return StageOutcome::Quit;
    };
    let follow_up = loop {
        let Some(line) = read_line("是否願意接受後續訪談？(y/n) > ") else {
            return StageOutcome::Quit;
        };
        match line.as_str() {
            "y" | "Y" => break true,
            "n" | "N" => break false,
            _ => println!("請輸入 y 或 n。"),
        }
    };
    let Some(comments) = read_line("其他想法（可留空）> ") else {
        return StageOutcome::Quit;
    };

    app.store.lock().unwrap().update(|doc| {
        doc.demographics.age_group = age_group.clone();
        doc.demographics.gender = gender.clone();
        doc.demographics.education_level = education_level.clone();
        doc.demographics.email = email.clone();
        doc.demographics.follow_up_consent = Some(follow_up);
        doc.demographics.additional_comments = comments.clone();
    });

    let mut payload = Map::new();
    payload.insert("age_group".to_string(), json!(age_group));
    payload.insert("gender".to_string(), json!(gender));
    payload.insert("education_level".to_string(), json!(education_level));
    payload.insert("email".to_string(), json!(email));
    payload.insert("follow_up_consent".to_string(), json!(follow_up));
    payload.insert("additional_comments".to_string(), json!(comments));
    app.autosave().sync_block(payload);
    StageOutcome::Advance
}

async fn run_debrief(app: &mut App) -> StageOutcome {
    println!("本研究旨在瞭解寫作者與 AI 助手協作時的作者感受。");
    println!("您的回答已全部送出，按 Enter 結束。");
    let _ = read_line("> ");

    let finalizer = Finalizer::new(app.storage.clone(), app.backend.clone());
    match finalizer.finish(&app.store).await {
        Some(seconds) => println!("總計用時 {} 秒。", seconds),
        None => println!("（無法回報完成狀態，您的本機資料已清除。）"),
    }
    StageOutcome::Advance
}
