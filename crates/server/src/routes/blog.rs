//! Blog post routes: detail pages, the editor, and post management.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::content::{initial_excerpt, render_markdown};
use crate::error::{AppError, AppResult};
use crate::models::blog::{STATUS_DRAFT, STATUS_PUBLISHED};
use crate::models::{Blog, Comment, CreateBlog, CreateComment, UpdateBlog};
use crate::models::{Bookmark, Like, User};
use crate::services::slug::generate_unique_slug;
use crate::state::AppState;

use super::front::PageQuery;
use super::helpers::{Pager, flash, page_context, render_page, require_login};

/// Related posts shown under a detail page.
const RELATED_LIMIT: i64 = 3;

/// Posts per page on /my-blogs.
const MY_BLOGS_PAGE_SIZE: i64 = 10;

/// Editor form fields.
#[derive(Debug, Deserialize)]
pub struct EditorForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub status: String,
}

/// Comment form fields.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

/// Values the editor template renders into its fields.
#[derive(Debug, Default, Serialize)]
struct EditorValues {
    title: String,
    content: String,
    tags: String,
    cover_image: String,
    status: String,
}

impl EditorValues {
    fn from_blog(blog: &Blog) -> Self {
        Self {
            title: blog.title.clone(),
            content: blog.content.clone(),
            tags: blog.tags.clone(),
            cover_image: blog.cover_image.clone(),
            status: blog.status.clone(),
        }
    }

    fn from_form(form: &EditorForm) -> Self {
        Self {
            title: form.title.trim().to_string(),
            content: form.content.trim().to_string(),
            tags: form.tags.trim().to_string(),
            cover_image: form.cover_image.trim().to_string(),
            status: normalize_status(&form.status).to_string(),
        }
    }
}

/// Create the blog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blog/{slug}", get(blog_detail))
        .route("/blog/{slug}/comment", post(post_comment))
        .route("/editor", get(editor_new).post(editor_create))
        .route("/editor/{id}", get(editor_edit).post(editor_update))
        .route("/duplicate/{id}", post(duplicate_blog))
        .route("/delete-blog/{id}", post(delete_blog))
        .route("/my-blogs", get(my_blogs))
}

/// Anything but an explicit `published` is stored as a draft.
fn normalize_status(status: &str) -> &'static str {
    if status == STATUS_PUBLISHED {
        STATUS_PUBLISHED
    } else {
        STATUS_DRAFT
    }
}

/// Detail-page path for a slug. Slugs keep Unicode word characters, so
/// the path segment is percent-encoded for the Location header.
fn detail_path(slug: &str) -> String {
    format!("/blog/{}", urlencoding::encode(slug))
}

/// Blog detail page.
///
/// GET /blog/{slug}
///
/// Published posts render for everyone and count a view. A draft renders
/// for its author only (no view counted); any other requester gets 404 so
/// foreign drafts are indistinguishable from missing posts.
async fn blog_detail(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let mut blog = Blog::find_by_slug(state.db(), &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    let (mut context, user) = page_context(&state, &session).await;
    let is_owner = user.as_ref().is_some_and(|u| u.id == blog.author_id);

    if blog.is_published() {
        // Count the view before rendering so the page shows the new total.
        match Blog::increment_views(state.db(), blog.id).await {
            Ok(()) => blog.views += 1,
            Err(e) => tracing::warn!(error = %e, blog_id = %blog.id, "failed to count view"),
        }
    } else if !is_owner {
        return Err(AppError::NotFound);
    }

    let author = User::find_by_id(state.db(), blog.author_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let related = match blog.first_tag() {
        Some(tag) => Blog::related_by_tag(state.db(), blog.id, tag, RELATED_LIMIT).await?,
        None => Vec::new(),
    };

    let comments = Comment::list_for_blog(state.db(), blog.id).await?;
    let comment_count = comments.len() as i64;
    let like_count = Like::count_for_blog(state.db(), blog.id).await?;
    let bookmark_count = Bookmark::count_for_blog(state.db(), blog.id).await?;

    let (liked, bookmarked) = match &user {
        Some(u) => (
            Like::find(state.db(), blog.id, u.id).await?.is_some(),
            Bookmark::find(state.db(), blog.id, u.id).await?.is_some(),
        ),
        None => (false, false),
    };

    let body_html = render_markdown(&blog.content);

    context.insert("blog", &blog);
    context.insert("body_html", &body_html);
    context.insert("author", &author);
    context.insert("related", &related);
    context.insert("comments", &comments);
    context.insert("comment_count", &comment_count);
    context.insert("like_count", &like_count);
    context.insert("bookmark_count", &bookmark_count);
    context.insert("liked", &liked);
    context.insert("bookmarked", &bookmarked);
    context.insert("is_owner", &is_owner);

    Ok(render_page(&state, "blog/detail.html", &context))
}

/// Append a comment to a post.
///
/// POST /blog/{slug}/comment
async fn post_comment(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let blog = Blog::find_by_slug(state.db(), &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    if !blog.is_published() && blog.author_id != user.id {
        return Err(AppError::NotFound);
    }

    let detail_url = detail_path(&blog.slug);

    let body = form.body.trim().to_string();
    if body.is_empty() {
        flash(&session, "danger", "Comment cannot be empty.").await;
        return Ok(Redirect::to(&detail_url).into_response());
    }

    Comment::create(
        state.db(),
        CreateComment {
            blog_id: blog.id,
            author_id: user.id,
            body,
        },
    )
    .await?;

    flash(&session, "success", "Comment posted.").await;
    Ok(Redirect::to(&detail_url).into_response())
}

/// Editor for a new post.
///
/// GET /editor
async fn editor_new(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    if let Err(redirect) = require_login(&state, &session).await {
        return Ok(redirect);
    }

    let values = EditorValues {
        status: STATUS_DRAFT.to_string(),
        ..EditorValues::default()
    };
    Ok(render_editor(&state, &session, None, &values).await)
}

/// Editor for an existing post, owner only.
///
/// GET /editor/{id}
async fn editor_edit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let blog = Blog::find_owned(state.db(), id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let values = EditorValues::from_blog(&blog);
    Ok(render_editor(&state, &session, Some(blog.id), &values).await)
}

/// Create a post from the editor.
///
/// POST /editor
async fn editor_create(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EditorForm>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let values = EditorValues::from_form(&form);
    if values.title.is_empty() || values.content.is_empty() {
        flash(&session, "danger", "Title and content are required.").await;
        return Ok(render_editor(&state, &session, None, &values).await);
    }

    let slug = generate_unique_slug(state.db(), &values.title).await?;
    let excerpt = initial_excerpt(&values.content);

    let blog = Blog::create(
        state.db(),
        CreateBlog {
            title: values.title,
            slug,
            content: values.content,
            excerpt,
            cover_image: values.cover_image,
            tags: values.tags,
            status: values.status,
            author_id: user.id,
        },
    )
    .await?;

    info!(blog_id = %blog.id, user_id = %user.id, slug = %blog.slug, "blog created");
    flash(&session, "success", "Blog saved successfully!").await;

    if blog.is_published() {
        Ok(Redirect::to(&detail_path(&blog.slug)).into_response())
    } else {
        Ok(Redirect::to(&format!("/editor/{}", blog.id)).into_response())
    }
}

/// Update a post from the editor, owner only.
///
/// POST /editor/{id}
///
/// The slug and excerpt are fixed at creation and survive every edit, so
/// published URLs never break.
async fn editor_update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<EditorForm>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    // Resolve ownership before validating so a foreign post is a 404, not
    // a validation error.
    Blog::find_owned(state.db(), id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let values = EditorValues::from_form(&form);
    if values.title.is_empty() || values.content.is_empty() {
        flash(&session, "danger", "Title and content are required.").await;
        return Ok(render_editor(&state, &session, Some(id), &values).await);
    }

    let blog = Blog::update(
        state.db(),
        id,
        user.id,
        UpdateBlog {
            title: Some(values.title),
            content: Some(values.content),
            cover_image: Some(values.cover_image),
            tags: Some(values.tags),
            status: Some(values.status),
        },
    )
    .await?
    .ok_or(AppError::NotFound)?;

    info!(blog_id = %blog.id, user_id = %user.id, "blog updated");
    flash(&session, "success", "Blog updated successfully!").await;

    if blog.is_published() {
        Ok(Redirect::to(&detail_path(&blog.slug)).into_response())
    } else {
        Ok(Redirect::to(&format!("/editor/{}", blog.id)).into_response())
    }
}

/// Copy a post as a fresh draft, owner only.
///
/// POST /duplicate/{id}
///
/// The new slug is generated from the original title, not the " (Copy)"
/// title, so copies line up as `my-post1`, `my-post2` beside the original.
async fn duplicate_blog(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let blog = Blog::find_owned(state.db(), id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let slug = generate_unique_slug(state.db(), &blog.title).await?;

    let copy = Blog::create(
        state.db(),
        CreateBlog {
            title: format!("{} (Copy)", blog.title),
            slug,
            content: blog.content.clone(),
            excerpt: blog.excerpt.clone(),
            cover_image: blog.cover_image.clone(),
            tags: blog.tags.clone(),
            status: STATUS_DRAFT.to_string(),
            author_id: user.id,
        },
    )
    .await?;

    info!(blog_id = %copy.id, source_id = %blog.id, user_id = %user.id, "blog duplicated");
    flash(&session, "success", "Draft copied. You can edit the copy now.").await;
    Ok(Redirect::to(&format!("/editor/{}", copy.id)).into_response())
}

/// Delete a post, owner only. Comments, likes, and bookmarks cascade.
///
/// POST /delete-blog/{id}
async fn delete_blog(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    if !Blog::delete(state.db(), id, user.id).await? {
        return Err(AppError::NotFound);
    }

    info!(blog_id = %id, user_id = %user.id, "blog deleted");
    flash(&session, "success", "Blog deleted successfully.").await;
    Ok(Redirect::to("/my-blogs").into_response())
}

/// The author's own posts, drafts included, most recently changed first.
///
/// GET /my-blogs?page=
async fn my_blogs(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let total = Blog::count_by_author(state.db(), user.id).await?;
    let pager = Pager::new(query.page, MY_BLOGS_PAGE_SIZE, total);
    let posts = Blog::list_by_author(state.db(), user.id, pager.per_page, pager.offset()).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("page_prefix", "/my-blogs?");
    context.insert("posts", &posts);
    context.insert("pager", &pager);

    Ok(render_page(&state, "blog/my_blogs.html", &context))
}

/// Render the editor with the given field values.
async fn render_editor(
    state: &AppState,
    session: &Session,
    blog_id: Option<Uuid>,
    values: &EditorValues,
) -> Response {
    let (mut context, _) = page_context(state, session).await;
    context.insert("blog_id", &blog_id);
    context.insert("editor", values);

    render_page(state, "blog/editor.html", &context)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status_published() {
        assert_eq!(normalize_status("published"), STATUS_PUBLISHED);
    }

    #[test]
    fn test_normalize_status_everything_else_is_draft() {
        assert_eq!(normalize_status("draft"), STATUS_DRAFT);
        assert_eq!(normalize_status(""), STATUS_DRAFT);
        assert_eq!(normalize_status("PUBLISHED"), STATUS_DRAFT);
        assert_eq!(normalize_status("archived"), STATUS_DRAFT);
    }

    #[test]
    fn test_detail_path_plain_slug_unchanged() {
        assert_eq!(detail_path("my-post"), "/blog/my-post");
        assert_eq!(detail_path("my-post1"), "/blog/my-post1");
    }

    #[test]
    fn test_detail_path_encodes_unicode() {
        assert_eq!(detail_path("città-aperta"), "/blog/citt%C3%A0-aperta");
    }

    #[test]
    fn test_editor_values_from_form_trims() {
        let form = EditorForm {
            title: "  My Post  ".to_string(),
            content: "  body  ".to_string(),
            tags: " rust, web ".to_string(),
            cover_image: String::new(),
            status: "published".to_string(),
        };
        let values = EditorValues::from_form(&form);
        assert_eq!(values.title, "My Post");
        assert_eq!(values.content, "body");
        assert_eq!(values.tags, "rust, web");
        assert_eq!(values.status, "published");
    }
}
