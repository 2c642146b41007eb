//! The built-in provider table.

use super::{Availability, ProviderEntry, TypeTemplates};
use crate::content::ContentType;
use crate::template::{QueryParam, TemplateContext, UrlTemplate};
use std::sync::OnceLock;

/// Provider used when the requested one is unknown or cannot serve a request
pub(super) const DEFAULT_PROVIDER: &str = "vidsrc";

fn always(
    by_content_id: UrlTemplate,
    by_external_id: Option<UrlTemplate>,
) -> Option<TypeTemplates> {
    Some(TypeTemplates {
        availability: Availability::Always,
        by_external_id,
        by_content_id: Some(by_content_id),
    })
}

fn requires_external_id(
    by_external_id: UrlTemplate,
    by_content_id: Option<UrlTemplate>,
) -> Option<TypeTemplates> {
    Some(TypeTemplates {
        availability: Availability::RequiresExternalId,
        by_external_id: Some(by_external_id),
        by_content_id,
    })
}

fn provider(
    id: &str,
    name: &str,
    movie: Option<TypeTemplates>,
    series: Option<TypeTemplates>,
) -> ProviderEntry {
    ProviderEntry {
        id: id.to_string(),
        name: name.to_string(),
        movie,
        series,
    }
}

fn ds_lang() -> QueryParam {
    QueryParam::language("ds_lang")
}

fn vidsrc() -> ProviderEntry {
    provider(
        DEFAULT_PROVIDER,
        "VidSrc",
        always(
            UrlTemplate::new("https://vidsrc.to/embed/movie/{id}").param(ds_lang()),
            Some(UrlTemplate::new("https://vidsrc.to/embed/movie/{external_id}").param(ds_lang())),
        ),
        always(
            UrlTemplate::new("https://vidsrc.to/embed/tv/{id}/{season}/{episode}").param(ds_lang()),
            Some(
                UrlTemplate::new("https://vidsrc.to/embed/tv/{external_id}/{season}/{episode}")
                    .param(ds_lang()),
            ),
        ),
    )
}

/// The built-in default provider, independent of any catalog
pub(super) fn fallback_provider() -> &'static ProviderEntry {
    static FALLBACK: OnceLock<ProviderEntry> = OnceLock::new();
    FALLBACK.get_or_init(vidsrc)
}

/// URL of the built-in default provider's content id template
///
/// Needs nothing but the numeric id, so it can be built for every request.
pub(super) fn fallback_url(content_type: ContentType, ctx: &TemplateContext<'_>) -> String {
    let mut url = match content_type {
        ContentType::Movie => format!("https://vidsrc.to/embed/movie/{}", ctx.content_id),
        ContentType::Series => format!(
            "https://vidsrc.to/embed/tv/{}/{}/{}",
            ctx.content_id, ctx.season, ctx.episode
        ),
    };

    let language = ctx.language.trim();
    if !language.is_empty() {
        url.push_str("?ds_lang=");
        url.push_str(&urlencoding::encode(language));
    }
    url
}

pub(super) fn providers() -> Vec<ProviderEntry> {
    vec![
        vidsrc(),
        provider(
            "vidsrc-xyz",
            "VidSrc XYZ",
            always(
                UrlTemplate::new("https://vidsrc.xyz/embed/movie?tmdb={id}")
                    .param(ds_lang())
                    .param(QueryParam::autoplay("autoplay", "1")),
                Some(
                    UrlTemplate::new("https://vidsrc.xyz/embed/movie?imdb={external_id}")
                        .param(ds_lang())
                        .param(QueryParam::autoplay("autoplay", "1")),
                ),
            ),
            always(
                UrlTemplate::new(
                    "https://vidsrc.xyz/embed/tv?tmdb={id}&season={season}&episode={episode}",
                )
                .param(ds_lang())
                .param(QueryParam::autoplay("autoplay", "1"))
                .param(QueryParam::autoplay("autonext", "1")),
                Some(
                    UrlTemplate::new(
                        "https://vidsrc.xyz/embed/tv?imdb={external_id}&season={season}&episode={episode}",
                    )
                    .param(ds_lang())
                    .param(QueryParam::autoplay("autoplay", "1"))
                    .param(QueryParam::autoplay("autonext", "1")),
                ),
            ),
        ),
        provider(
            "vidking",
            "Vidking",
            always(
                UrlTemplate::new("https://www.vidking.net/embed/movie/{id}")
                    .param(QueryParam::fixed("color", "e50914"))
                    .param(QueryParam::autoplay("autoPlay", "true")),
                None,
            ),
            always(
                UrlTemplate::new("https://www.vidking.net/embed/tv/{id}/{season}/{episode}")
                    .param(QueryParam::fixed("color", "e50914"))
                    .param(QueryParam::autoplay("autoPlay", "true"))
                    .param(QueryParam::fixed("nextEpisode", "true"))
                    .param(QueryParam::fixed("episodeSelector", "true")),
                None,
            ),
        ),
        provider(
            "vidlink",
            "VidLink",
            always(
                UrlTemplate::new("https://vidlink.pro/movie/{id}")
                    .param(QueryParam::autoplay("autoplay", "true")),
                None,
            ),
            always(
                UrlTemplate::new("https://vidlink.pro/tv/{id}/{season}/{episode}")
                    .param(QueryParam::autoplay("autoplay", "true"))
                    .param(QueryParam::fixed("nextbutton", "true")),
                None,
            ),
        ),
        provider(
            "embedsu",
            "Embed.su",
            always(UrlTemplate::new("https://embed.su/embed/movie/{id}"), None),
            always(
                UrlTemplate::new("https://embed.su/embed/tv/{id}/{season}/{episode}"),
                None,
            ),
        ),
        provider(
            "autoembed",
            "AutoEmbed",
            always(
                UrlTemplate::new("https://player.autoembed.cc/embed/movie/{id}")
                    .param(QueryParam::ad_free("noads", "1")),
                Some(
                    UrlTemplate::new("https://player.autoembed.cc/embed/movie/{external_id}")
                        .param(QueryParam::ad_free("noads", "1")),
                ),
            ),
            always(
                UrlTemplate::new("https://player.autoembed.cc/embed/tv/{id}/{season}/{episode}")
                    .param(QueryParam::ad_free("noads", "1")),
                Some(
                    UrlTemplate::new(
                        "https://player.autoembed.cc/embed/tv/{external_id}/{season}/{episode}",
                    )
                    .param(QueryParam::ad_free("noads", "1")),
                ),
            ),
        ),
        provider(
            "moviesapi",
            "MoviesAPI",
            always(UrlTemplate::new("https://moviesapi.club/movie/{id}"), None),
            always(
                UrlTemplate::new("https://moviesapi.club/tv/{id}-{season}-{episode}"),
                None,
            ),
        ),
        provider(
            "smashystream",
            "SmashyStream",
            always(
                UrlTemplate::new("https://player.smashy.stream/movie/{id}"),
                Some(UrlTemplate::new("https://player.smashy.stream/movie/{external_id}")),
            ),
            always(
                UrlTemplate::new("https://player.smashy.stream/tv/{id}?s={season}&e={episode}"),
                None,
            ),
        ),
        provider(
            "vidrock",
            "VidRock",
            requires_external_id(
                UrlTemplate::new("https://vidrock.net/movie/{external_id}")
                    .param(QueryParam::autoplay("autoplay", "true")),
                Some(
                    UrlTemplate::new("https://vidrock.net/movie/{id}")
                        .param(QueryParam::autoplay("autoplay", "true")),
                ),
            ),
            requires_external_id(
                UrlTemplate::new("https://vidrock.net/series/{external_id}/{season}/{episode}")
                    .param(QueryParam::autoplay("autoplay", "true")),
                Some(
                    UrlTemplate::new("https://vidrock.net/series/{id}/{season}/{episode}")
                        .param(QueryParam::autoplay("autoplay", "true")),
                ),
            ),
        ),
        provider(
            "2embed",
            "2Embed",
            requires_external_id(
                UrlTemplate::new("https://www.2embed.cc/embed/{external_id}"),
                None,
            ),
            requires_external_id(
                UrlTemplate::new(
                    "https://www.2embed.cc/embedtv/{external_id}?s={season}&e={episode}",
                ),
                None,
            ),
        ),
        provider(
            "multiembed",
            "SuperEmbed",
            requires_external_id(
                UrlTemplate::new("https://multiembed.mov/?video_id={external_id}"),
                Some(UrlTemplate::new("https://multiembed.mov/?video_id={id}&tmdb=1")),
            ),
            requires_external_id(
                UrlTemplate::new(
                    "https://multiembed.mov/?video_id={external_id}&s={season}&e={episode}",
                ),
                Some(UrlTemplate::new(
                    "https://multiembed.mov/?video_id={id}&tmdb=1&s={season}&e={episode}",
                )),
            ),
        ),
        provider(
            "streamflix",
            "StreamFlix",
            requires_external_id(
                UrlTemplate::new("https://streamflix.one/movie/{slug}/{external_id}")
                    .param(QueryParam::language("lang")),
                Some(
                    UrlTemplate::new("https://streamflix.one/movie/tmdb-{id}")
                        .param(QueryParam::language("lang")),
                ),
            ),
            requires_external_id(
                UrlTemplate::new(
                    "https://streamflix.one/tv/{slug}/{external_id}/{season}/{episode}",
                )
                .param(QueryParam::language("lang")),
                Some(
                    UrlTemplate::new("https://streamflix.one/tv/tmdb-{id}/{season}/{episode}")
                        .param(QueryParam::language("lang")),
                ),
            ),
        ),
        provider(
            "cineb",
            "Cineb",
            always(
                UrlTemplate::new("https://cineb.rs/embed/movie/{id}"),
                Some(UrlTemplate::new("https://cineb.rs/watch/{slug}-{external_id}")),
            ),
            None,
        ),
    ]
}
