use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use feed_client::{
    ApiClient, FeedClientError, FeedLoader, FeedPost, FeedState, FileSessionStore,
    PaginationTrigger, Post, SessionStore, User, validate,
};

mod logging;

const SESSION_FILE: &str = ".feed_session";
const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Debug, Parser)]
#[command(name = "feed-cli", version, about = "CLI клиент социальной ленты")]
struct Cli {
    /// Адрес сервера (по умолчанию переменная FEED_API_URL или localhost:3000).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя по никнейму.
    Register {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Вход: поиск пользователя по никнейму и сохранение сессии.
    Login {
        #[arg(long)]
        nickname: String,
    },
    /// Удаление сохранённой сессии.
    Logout,
    /// Текущий пользователь сессии.
    Whoami,
    /// Лента публикаций: постраничная загрузка с обогащением.
    Feed {
        /// Размер страницы.
        #[arg(long, default_value_t = 5)]
        limit: u32,
        /// Сколько страниц загрузить.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Загрузить все страницы до конца ленты.
        #[arg(long)]
        all: bool,
        /// Показать только публикации автора с этим id.
        #[arg(long)]
        user: Option<i64>,
    },
    /// Профиль: все публикации текущего пользователя сессии.
    Profile {
        /// Размер страницы.
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Публикация целиком: текст, автор, теги, картинки, комментарии.
    Get {
        #[arg(long)]
        id: i64,
    },
    /// Создание публикации (требует сессию).
    Create {
        #[arg(long)]
        description: String,
        /// URL картинки; можно указать несколько раз.
        #[arg(long = "image")]
        images: Vec<String>,
        /// Имя тега; можно указать несколько раз, тег создаётся при необходимости.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Обновление текста своей публикации (требует сессию).
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        description: String,
    },
    /// Удаление своей публикации (требует сессию).
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Комментарий к публикации (требует сессию).
    Comment {
        #[arg(long)]
        post_id: i64,
        #[arg(long)]
        text: String,
    },
    /// Список всех тегов.
    Tags,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging("warn")?;

    let cli = Cli::parse();

    let base_url = resolve_server(cli.server);
    let client = ApiClient::new(base_url);
    let session = FileSessionStore::new(SESSION_FILE);

    match cli.command {
        Command::Register { nickname, email } => {
            validate::validate_nick_name(&nickname).map_err(|msg| anyhow!(msg))?;

            let existing = client
                .find_user(&nickname)
                .await
                .map_err(map_client_error)?;
            if existing.is_some() {
                return Err(anyhow!("никнейм «{nickname}» уже занят"));
            }

            let user = client
                .create_user(nickname.trim(), email.as_deref())
                .await
                .map_err(map_client_error)?;
            session
                .save(&user)
                .map_err(|msg| anyhow!(msg))
                .context("не удалось сохранить сессию")?;
            print_user("Регистрация успешна", &user);
        }
        Command::Login { nickname } => {
            validate::validate_nick_name(&nickname).map_err(|msg| anyhow!(msg))?;

            let user = client
                .find_user(&nickname)
                .await
                .map_err(map_client_error)?
                .ok_or_else(|| anyhow!("пользователь «{nickname}» не найден"))?;
            session
                .save(&user)
                .map_err(|msg| anyhow!(msg))
                .context("не удалось сохранить сессию")?;
            print_user("Вход выполнен", &user);
        }
        Command::Logout => {
            session.clear().map_err(|msg| anyhow!(msg))?;
            println!("Сессия удалена");
        }
        Command::Whoami => match session.load() {
            Some(user) => print_user("Текущий пользователь", &user),
            None => println!("Сессии нет: выполните `feed-cli login --nickname ...`"),
        },
        Command::Feed {
            limit,
            pages,
            all,
            user,
        } => {
            run_feed(&client, limit, pages, all, user).await?;
        }
        Command::Profile { limit } => {
            // профиль — это общая лента, прокрученная до конца и
            // отфильтрованная по автору, как делает веб-версия
            let user = require_session(&session)?;
            run_feed(&client, limit, 0, true, Some(user.id)).await?;
        }
        Command::Get { id } => {
            let post = client.get_post(id).await.map_err(map_client_error)?;
            let comments = client
                .comments_for_post(id)
                .await
                .unwrap_or_default();
            let images = client.images_for_post(id).await.unwrap_or_default();

            print_post_detail(&post, comments.len());
            for image in &images {
                println!("  картинка: {}", image.url);
            }
            for comment in &comments {
                let author = comment
                    .author
                    .as_ref()
                    .map(|a| a.nick_name.clone())
                    .unwrap_or_else(|| format!("user {}", comment.user_id));
                println!("  @{author}: {}", comment.text);
            }
        }
        Command::Create {
            description,
            images,
            tags,
        } => {
            let user = require_session(&session)?;
            validate::validate_description(&description).map_err(|msg| anyhow!(msg))?;

            let post = client
                .create_post(user.id, description.trim())
                .await
                .map_err(map_client_error)?;

            for url in &images {
                if let Err(err) = client.create_image(post.id, url).await {
                    eprintln!("картинка {url} не привязана: {err}");
                }
            }
            // теги цепляем по принципу «лучшее из возможного», как веб-версия
            for name in &tags {
                match client.get_or_create_tag(name).await {
                    Ok(tag) => {
                        if let Err(err) = client.add_tag_to_post(post.id, tag.id).await {
                            eprintln!("тег «{name}» не привязан: {err}");
                        }
                    }
                    Err(err) => eprintln!("тег «{name}» не создан: {err}"),
                }
            }

            println!("Публикация создана: id={}", post.id);
        }
        Command::Update { id, description } => {
            let user = require_session(&session)?;
            validate::validate_description(&description).map_err(|msg| anyhow!(msg))?;

            let post = client.get_post(id).await.map_err(map_client_error)?;
            ensure_author(&user, &post)?;

            let updated = client
                .update_post(id, description.trim())
                .await
                .map_err(map_client_error)?;
            println!("Публикация обновлена: id={}", updated.id);
        }
        Command::Delete { id } => {
            let user = require_session(&session)?;

            let post = client.get_post(id).await.map_err(map_client_error)?;
            ensure_author(&user, &post)?;

            client.delete_post(id).await.map_err(map_client_error)?;
            println!("Публикация удалена: id={id}");
        }
        Command::Comment { post_id, text } => {
            let user = require_session(&session)?;
            if !validate::required(&text) {
                return Err(anyhow!("текст комментария не может быть пустым"));
            }

            let comment = client
                .create_comment(post_id, user.id, text.trim())
                .await
                .map_err(map_client_error)?;
            println!("Комментарий добавлен: id={}", comment.id);
        }
        Command::Tags => {
            let tags = client.list_tags().await.map_err(map_client_error)?;
            println!("Тегов: {}", tags.len());
            for tag in &tags {
                println!("- [{}] #{}", tag.id, tag.name);
            }
        }
    }

    Ok(())
}

async fn run_feed(
    client: &ApiClient,
    limit: u32,
    pages: u32,
    all: bool,
    author: Option<i64>,
) -> Result<()> {
    let loader = FeedLoader::new(client.clone(), limit.max(1));
    let mut trigger = PaginationTrigger::new();
    let mut fetched_pages = 0u32;

    // сторож «всегда виден»: CLI мотает ленту до запрошенной глубины
    while all || fetched_pages < pages {
        let state = loader.snapshot();
        if !trigger.on_visibility(true, state.is_loading(), state.has_more()) {
            break;
        }
        loader.fetch_next().await.map_err(map_client_error)?;
        trigger.rearm();
        fetched_pages += 1;
    }

    print_feed(&loader.snapshot(), author);
    Ok(())
}

fn resolve_server(server: Option<String>) -> String {
    let raw = server
        .or_else(|| std::env::var("FEED_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn require_session(session: &FileSessionStore) -> Result<User> {
    session
        .load()
        .ok_or_else(|| anyhow!("требуется вход: выполните `feed-cli login --nickname ...`"))
}

fn ensure_author(user: &User, post: &Post) -> Result<()> {
    if post.user_id != user.id {
        return Err(anyhow!(
            "публикация id={} принадлежит другому пользователю",
            post.id
        ));
    }
    Ok(())
}

fn map_client_error(err: FeedClientError) -> anyhow::Error {
    let message = match err {
        FeedClientError::NotFound => "ресурс не найден".to_string(),
        FeedClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        FeedClientError::Http(err) => format!("ошибка HTTP: {err}"),
        FeedClientError::Decode(message) => format!("не удалось разобрать ответ: {message}"),
    };
    anyhow::anyhow!(message)
}

fn print_user(title: &str, user: &User) {
    println!("{title}");
    println!("  id: {}", user.id);
    println!("  nickname: {}", user.nick_name);
    if let Some(email) = &user.email {
        println!("  email: {email}");
    }
}

fn format_feed_line(item: &FeedPost) -> String {
    let author = item
        .post
        .author
        .as_ref()
        .map(|a| a.nick_name.clone())
        .unwrap_or_else(|| format!("user {}", item.post.user_id));

    let mut line = format!(
        "- [{}] @{author}: {} (комментариев: {}, картинок: {})",
        item.post.id,
        item.post.description,
        item.comment_count,
        item.image_urls.len()
    );
    if !item.post.tags.is_empty() {
        let tags: Vec<String> = item.post.tags.iter().map(|t| format!("#{}", t.name)).collect();
        line.push_str(&format!(" {}", tags.join(" ")));
    }
    line
}

fn print_feed(state: &FeedState, author: Option<i64>) {
    if let Some(error) = state.visible_error() {
        println!("{error}");
        return;
    }

    let items: Vec<&FeedPost> = match author {
        Some(user_id) => state.items_by_author(user_id).collect(),
        None => state.items().iter().collect(),
    };

    println!(
        "Публикаций: {} (страниц загружено: {})",
        items.len(),
        state.current_page()
    );
    for item in items {
        println!("{}", format_feed_line(item));
    }
    if !state.has_more() {
        println!("Больше публикаций нет.");
    }
}

fn print_post_detail(post: &Post, comment_count: usize) {
    println!("Публикация id={}", post.id);
    if let Some(author) = &post.author {
        println!("  автор: @{}", author.nick_name);
    } else {
        println!("  автор: user {}", post.user_id);
    }
    println!("  текст: {}", post.description);
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t.name)).collect();
        println!("  теги: {}", tags.join(" "));
    }
    if let Some(created_at) = post.created_at {
        println!("  создана: {created_at}");
    }
    println!("  комментариев: {comment_count}");
}
