//! Tests for the portal handshake, catalog loading and link resolution
//!
//! Runs against a canned-response HTTP server on a loopback port; one
//! connection per expected request, request paths reported back for
//! asserting what the client actually sent.

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    use crate::errors::PortalError;
    use crate::models::ContentKind;
    use crate::portal::*;

    fn serve(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, mpsc::Receiver<String>, thread::JoinHandle<()>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let request = String::from_utf8_lossy(&request).to_string();
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                tx.send(path).unwrap();
                let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (format!("http://{}", addr), rx, handle)
    }

    const MAC: &str = "00:1A:79:12:34:56";
    const TOKEN_BODY: &str = r#"{"js":{"token":"abc123"}}"#;

    fn authenticated_client(
        extra: Vec<(u16, &'static str)>,
    ) -> (PortalClient, mpsc::Receiver<String>, thread::JoinHandle<()>) {
        let mut responses = vec![(200, TOKEN_BODY)];
        responses.extend(extra);
        let (url, rx, handle) = serve(responses);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        client.handshake().unwrap();
        // drop the handshake request path
        rx.recv().unwrap();
        (client, rx, handle)
    }

    #[test]
    fn test_handshake_success() {
        let (url, rx, handle) = serve(vec![(200, TOKEN_BODY)]);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        assert_eq!(client.state(), SessionState::Unauthenticated);

        let session = client.handshake().unwrap();
        assert_eq!(session.token, "abc123");
        assert_eq!(
            session.headers.get("Authorization").map(String::as_str),
            Some("Bearer abc123")
        );
        assert_eq!(client.state(), SessionState::Authenticated);
        assert_eq!(client.token(), Some("abc123"));

        let path = rx.recv().unwrap();
        assert!(path.starts_with("/server/load.php?type=stb&action=handshake"));
        assert!(path.contains("prehash=0"));
        assert!(path.contains("JsHttpRequest=1-xml"));
        handle.join().unwrap();
    }

    #[test]
    fn test_handshake_headers_mimic_stb() {
        let (url, rx, handle) = serve(vec![(200, TOKEN_BODY)]);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        let session = client.handshake().unwrap();

        let ua = session.headers.get("User-Agent").unwrap();
        assert!(ua.contains("MAG200"));
        let cookie = session.headers.get("Cookie").unwrap();
        assert!(cookie.contains("mac=00:1A:79:12:34:56"));
        assert!(cookie.contains("stb_lang=en"));
        assert!(cookie.contains("timezone=Europe/Kiev"));
        // base URL has no path, so the referer points at /c/
        assert!(session.headers.get("Referer").unwrap().ends_with("/c/"));

        rx.recv().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_handshake_reuses_cached_token() {
        let (url, rx, handle) = serve(vec![(200, TOKEN_BODY)]);
        let mut client = PortalClient::new(&url, MAC)
            .unwrap()
            .with_cached_token("CACHEDTOKEN00000000000000000000A");
        client.handshake().unwrap();

        let path = rx.recv().unwrap();
        assert!(path.contains("token=CACHEDTOKEN00000000000000000000A"));
        handle.join().unwrap();
    }

    #[test]
    fn test_handshake_falls_back_exactly_once() {
        let (url, rx, handle) = serve(vec![(500, ""), (200, TOKEN_BODY)]);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        let session = client.handshake().unwrap();
        assert_eq!(session.token, "abc123");

        handle.join().unwrap();
        let paths: Vec<String> = rx.try_iter().collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].starts_with("/server/load.php"));
        assert!(paths[1].starts_with("/portal.php"));
    }

    #[test]
    fn test_handshake_fails_after_both_endpoints() {
        let (url, rx, handle) = serve(vec![(500, ""), (500, "")]);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        let err = client.handshake().unwrap_err();
        assert!(matches!(err.source, PortalError::Protocol(_)));
        assert_eq!(client.state(), SessionState::HandshakeFailed);
        assert!(client.session().is_none());

        handle.join().unwrap();
        // no retry storm: one request per endpoint
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_handshake_missing_token_field_fails() {
        let (url, rx, handle) = serve(vec![(200, r#"{"js":{}}"#), (200, r#"{"nope":1}"#)]);
        let mut client = PortalClient::new(&url, MAC).unwrap();
        assert!(client.handshake().is_err());
        assert_eq!(client.state(), SessionState::HandshakeFailed);

        handle.join().unwrap();
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_create_link_takes_last_token() {
        let (client, rx, handle) = authenticated_client(vec![(200, r#"{"js":{"cmd":"ffmpeg http://x/y.ts"}}"#)]);
        let link = client.create_link("ffmpeg http://localhost/ch/482_").unwrap();
        assert_eq!(link, "http://x/y.ts");

        let path = rx.recv().unwrap();
        assert!(path.contains("type=itv&action=create_link"));
        assert!(path.contains("cmd=ffmpeg%20http%3A%2F%2Flocalhost%2Fch%2F482_"));
        handle.join().unwrap();
    }

    #[test]
    fn test_create_episode_link_uses_vod_with_series() {
        let (client, rx, handle) = authenticated_client(vec![(200, r#"{"js":{"cmd":"http://x/ep3.ts"}}"#)]);
        let link = client.create_episode_link("/media/500.mpg", 3).unwrap();
        assert_eq!(link, "http://x/ep3.ts");

        let path = rx.recv().unwrap();
        assert!(path.contains("type=vod&action=create_link"));
        assert!(path.contains("series=3"));
        handle.join().unwrap();
    }

    #[test]
    fn test_create_link_requires_session() {
        let client = PortalClient::new("http://portal.example", MAC).unwrap();
        let err = client.create_link("cmd").unwrap_err();
        assert!(matches!(err.source, PortalError::Unauthenticated));
    }

    #[test]
    fn test_get_all_channels() {
        let body = r#"{"js":{"data":[
            {"id":"10","name":"CNN","logo":"http://logos/cnn.png","cmd":"ffmpeg http://localhost/ch/10_","tv_genre_id":3},
            {"id":11,"name":"BBC One","logo":"","cmd":"ffmpeg http://localhost/ch/11_"},
            {"id":12,"cmd":"nameless entries are dropped"}
        ]}}"#;
        let (client, rx, handle) = authenticated_client(vec![(200, body)]);

        let channels = client.get_all_channels().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].id, 10);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].group.as_deref(), Some("3"));
        assert_eq!(channels[1].id, 11);
        assert_eq!(channels[1].logo, None);

        let path = rx.recv().unwrap();
        assert!(path.contains("type=itv&action=get_all_channels"));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_categories_per_kind() {
        let (client, rx, handle) = authenticated_client(vec![
                (200, r#"{"js":[{"id":"1","title":"News"},{"id":2,"title":"Sport"}]}"#),
                (200, r#"{"js":[{"id":"20","title":"Drama"}]}"#),
                (200, r#"{"js":[{"id":"30","title":"Crime"}]}"#),
            ]);

        let genres = client.get_itv_genres().unwrap();
        assert_eq!(genres.len(), 2);
        assert_eq!(genres[1].id, "2");
        let vod = client.get_vod_categories().unwrap();
        assert_eq!(vod[0].title, "Drama");
        let series = client.get_series_categories().unwrap();
        assert_eq!(series[0].title, "Crime");

        let paths: Vec<String> = rx.try_iter().collect();
        assert!(paths[0].contains("type=itv&action=get_genres"));
        assert!(paths[1].contains("type=vod&action=get_categories"));
        assert!(paths[2].contains("type=series&action=get_categories"));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_ordered_list_reports_page_counts() {
        let body = r#"{"js":{"total_items":"5","max_page_items":2,"data":[
            {"id":"7","name":"Movie A","cmd":"/media/7.mpg","logo":"http://logos/a.png","category_id":"12"},
            {"id":8,"name":"Movie B","cmd":"/media/8.mpg"}
        ]}}"#;
        let (client, rx, handle) = authenticated_client(vec![(200, body)]);

        let page = client
            .get_ordered_list(ContentKind::Vod, "12", SortBy::Name, 1)
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.max_page_items, 2);
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.items[0].name, "Movie A");
        assert_eq!(page.items[0].category_id.as_deref(), Some("12"));
        assert_eq!(page.items[1].id, "8");

        let path = rx.recv().unwrap();
        assert!(path.contains("type=vod&action=get_ordered_list"));
        assert!(path.contains("genre=12"));
        assert!(path.contains("sortby=name"));
        assert!(path.contains("fav=0"));
        assert!(path.contains("p=1"));
        // vod listings carry no series parameters
        assert!(!path.contains("movie_id="));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_ordered_list_requires_counters() {
        let (client, _rx, handle) =
            authenticated_client(vec![(200, r#"{"js":{"data":[]}}"#)]);
        let err = client
            .get_ordered_list(ContentKind::Vod, "12", SortBy::Name, 1)
            .unwrap_err();
        assert!(matches!(err, PortalError::Protocol(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_seasons_fetches_every_page() {
        let page1 = r#"{"js":{"total_items":3,"max_page_items":2,"data":[
            {"id":"s1","name":"Season 1","cmd":"/media/500.mpg","series":[1,2,3]},
            {"id":"s2","name":"Season 2","cmd":"/media/501.mpg","series":[1,2]}
        ]}}"#;
        let page2 = r#"{"js":{"total_items":3,"max_page_items":2,"data":[
            {"id":"s3","name":"Season 3","cmd":"/media/502.mpg","series":[1]}
        ]}}"#;
        let (client, rx, handle) = authenticated_client(vec![(200, page1), (200, page2)]);

        let seasons = client.get_seasons("4", "99").unwrap();
        assert_eq!(seasons.len(), 3);
        assert_eq!(seasons[0].episodes, vec![1, 2, 3]);
        assert_eq!(seasons[2].name, "Season 3");

        let paths: Vec<String> = rx.try_iter().collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].contains("type=series&action=get_ordered_list"));
        assert!(paths[0].contains("sortby=added"));
        assert!(paths[0].contains("movie_id=99"));
        assert!(paths[0].contains("category=4"));
        assert!(paths[0].contains("season_id=0"));
        assert!(paths[0].contains("p=1"));
        assert!(paths[1].contains("p=2"));
        handle.join().unwrap();
    }

    #[test]
    fn test_load_catalog_tolerates_partial_failure() {
        let (client, _rx, handle) = authenticated_client(vec![
                (500, ""),
                (200, r#"{"js":[{"id":"1","title":"News"}]}"#),
                (200, r#"{"js":[{"id":"20","title":"Drama"}]}"#),
                (500, ""),
            ]);

        let catalog = client.load_catalog();
        assert!(catalog.channels.is_empty());
        assert_eq!(catalog.genres.len(), 1);
        assert_eq!(catalog.vod_categories.len(), 1);
        assert!(catalog.series_categories.is_empty());
        handle.join().unwrap();
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_token());
    }
}
