//! Built-in library and tool definitions.

use super::detectors::{
    DevToolsDetector, GccDetector, GsoapDetector, KbuildDetector, OpenWatcomDetector,
    PythonCApiDetector, PythonModulesDetector, VisualCppDetector, XcodeDetector,
};
use super::{LibraryProbe, Probe, ToolProbe};
use crate::target::{TargetOs, TargetSet};

fn unix_like() -> TargetSet {
    TargetSet::only(&[TargetOs::Linux, TargetOs::Solaris, TargetOs::Bsd])
}

/// Every known library, sorted by name.
pub fn libraries() -> Vec<LibraryProbe> {
    let mut libs = vec![
        LibraryProbe::new("softfloat", &["softfloat.h", "iprt/cdefs.h"], &["libsoftfloat"], TargetSet::Any)
            .with_code("#define IN_RING3\n#include <softfloat.h>\nint main() { softfloat_state_t s; float32_t x, y; f32_add(x, y, &s); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("dxmt", &["version.h"], &["libdxmt"], unix_like())
            .with_code("#include <version.h>\nint main() { return 0; }\n"),
        LibraryProbe::new("dxvk", &["dxvk/dxvk.h"], &["libdxvk"], TargetSet::only(&[TargetOs::Linux]))
            .with_code("#include <dxvk/dxvk.h>\nint main() { printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("libalsa", &["alsa/asoundlib.h"], &["libasound"], unix_like())
            .with_code("#include <alsa/asoundlib.h>\n#include <alsa/version.h>\nint main() { snd_pcm_info_sizeof(); printf(\"%s\", SND_LIB_VERSION_STR); return 0; }\n"),
        LibraryProbe::new("libcap", &["sys/capability.h"], &["libcap"], unix_like())
            .with_code("#include <sys/capability.h>\nint main() { cap_t c = cap_init(); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("libcursor", &["X11/cursorfont.h"], &["libXcursor"], unix_like())
            .with_code("#include <X11/Xcursor/Xcursor.h>\nint main() { printf(\"%d.%d\", XCURSOR_LIB_MAJOR, XCURSOR_LIB_MINOR); return 0; }\n"),
        LibraryProbe::new("curl", &["curl/curl.h"], &["libcurl"], TargetSet::Any)
            .with_code("#include <curl/curl.h>\nint main() { printf(\"%s\", LIBCURL_VERSION); return 0; }\n"),
        LibraryProbe::new("libdevmapper", &["libdevmapper.h"], &["libdevmapper"], unix_like())
            .with_code("#include <libdevmapper.h>\nint main() { char v[64]; dm_get_library_version(v, sizeof(v)); printf(\"%s\", v); return 0; }\n"),
        LibraryProbe::new("libjpeg-turbo", &["turbojpeg.h"], &["libturbojpeg"], TargetSet::Any)
            .with_code("#include <turbojpeg.h>\nint main() { tjInitCompress(); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("liblzf", &["lzf.h"], &["liblzf"], TargetSet::Any)
            .with_code("#include <liblzf/lzf.h>\nint main() { printf(\"%d.%d\", LZF_VERSION >> 8, LZF_VERSION & 0xff);\n#if LZF_VERSION >= 0x0105\nreturn 0;\n#else\nreturn 1;\n#endif\n }\n"),
        LibraryProbe::new("liblzma", &["lzma.h"], &["liblzma"], TargetSet::Any)
            .with_code("#include <lzma.h>\nint main() { printf(\"%s\", lzma_version_string()); return 0; }\n"),
        LibraryProbe::new("libogg", &["ogg/ogg.h"], &["libogg"], TargetSet::Any)
            .with_code("#include <ogg/ogg.h>\nint main() { oggpack_buffer o; oggpack_get_buffer(&o); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("libpam", &["security/pam_appl.h"], &["libpam"], unix_like())
            .with_code("#include <security/pam_appl.h>\nint main() { \n#ifdef __LINUX_PAM__\nprintf(\"%d.%d\", __LINUX_PAM__, __LINUX_PAM_MINOR__); if (__LINUX_PAM__ >= 1) return 0;\n#endif\nreturn 1; }\n"),
        LibraryProbe::new("libpng", &["png.h"], &["libpng"], TargetSet::Any)
            .with_code("#include <png.h>\nint main() { printf(\"%s\", PNG_LIBPNG_VER_STRING); return 0; }\n"),
        LibraryProbe::new("libpthread", &["pthread.h"], &["libpthread"], unix_like())
            .with_code("#include <unistd.h>\n#include <pthread.h>\nint main() { \n#ifdef _POSIX_VERSION\nprintf(\"%ld\", (long)_POSIX_VERSION); return 0;\n#else\nreturn 1;\n#endif\n }\n"),
        LibraryProbe::new("libpulse", &["pulse/pulseaudio.h", "pulse/version.h"], &["libpulse"], unix_like())
            .with_code("#include <pulse/version.h>\nint main() { printf(\"%s\", pa_get_library_version()); return 0; }\n"),
        LibraryProbe::new("libslirp", &["slirp/libslirp.h", "slirp/libslirp-version.h"], &["libslirp"], TargetSet::Any)
            .with_code("#include <slirp/libslirp.h>\n#include <slirp/libslirp-version.h>\nint main() { printf(\"%d.%d.%d\", SLIRP_MAJOR_VERSION, SLIRP_MINOR_VERSION, SLIRP_MICRO_VERSION); return 0; }\n"),
        LibraryProbe::new("libssh", &["libssh/libssh.h"], &["libssh"], unix_like())
            .with_code("#include <libssh/libssh.h>\n#include <libssh/libssh_version.h>\nint main() { printf(\"%d.%d.%d\", LIBSSH_VERSION_MAJOR, LIBSSH_VERSION_MINOR, LIBSSH_VERSION_MICRO); return 0; }\n"),
        LibraryProbe::new("libstdc++", &["c++/11/iostream"], &[], unix_like())
            .with_code("int main() { \n #ifdef __GLIBCXX__\nstd::cout << __GLIBCXX__;\n#elif defined(__GLIBCPP__)\nstd::cout << __GLIBCPP__;\n#else\nreturn 1;\n#endif\nreturn 0; }\n")
            .with_alt_headers(&["c++/4.8.2/iostream", "c++/iostream"]),
        LibraryProbe::new("libtpms", &["libtpms/tpm_library.h"], &["libtpms"], TargetSet::Any)
            .with_code("#include <libtpms/tpm_library.h>\nint main() { printf(\"%d.%d.%d\", TPM_LIBRARY_VER_MAJOR, TPM_LIBRARY_VER_MINOR, TPM_LIBRARY_VER_MICRO); return 0; }\n"),
        LibraryProbe::new("libvncserver", &["rfb/rfb.h", "rfb/rfbclient.h"], &["libvncserver"], unix_like())
            .with_code("#include <rfb/rfb.h>\nint main() { printf(\"%s\", LIBVNCSERVER_PACKAGE_VERSION); return 0; }\n"),
        LibraryProbe::new("libvorbis", &["vorbis/vorbisenc.h"], &["libvorbis", "libvorbisenc"], TargetSet::Any)
            .with_code("#include <vorbis/vorbisenc.h>\nint main() { vorbis_info v; vorbis_info_init(&v); vorbis_encode_init_vbr(&v, 2, 44100, (float).4); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("libvpx", &["vpx/vpx_decoder.h"], &["libvpx"], TargetSet::Any)
            .with_code("#include <vpx/vpx_codec.h>\nint main() { printf(\"%s\", vpx_codec_version_str()); return 0; }\n"),
        LibraryProbe::new("libxml2", &["libxml/parser.h"], &["libxml2"], TargetSet::Any)
            .with_code("#include <libxml/xmlversion.h>\nint main() { printf(\"%s\", LIBXML_DOTTED_VERSION); return 0; }\n"),
        LibraryProbe::new("zlib", &["zlib.h"], &["libz"], TargetSet::Any)
            .with_code("#include <zlib.h>\nint main() { printf(\"%s\", ZLIB_VERSION); return 0; }\n"),
        LibraryProbe::new("lwip", &["lwip/init.h"], &["liblwip"], TargetSet::Any)
            .with_code("#include <lwip/init.h>\nint main() { printf(\"%d.%d.%d\", LWIP_VERSION_MAJOR, LWIP_VERSION_MINOR, LWIP_VERSION_REVISION); return 0; }\n"),
        LibraryProbe::new("opengl", &["GL/gl.h"], &["libGL"], TargetSet::Any)
            .with_code("#include <GL/gl.h>\nint main() { const GLubyte *s = glGetString(GL_VERSION); printf(\"%s\", s ? (const char *)s : \"<found>\"); return 0; }\n"),
        LibraryProbe::new("qt6", &["QtCore/qconfig.h"], &["libQt6Core"], TargetSet::Any)
            .with_code("#include <qt6/QtCore/qconfig.h>\nint main() { printf(\"%s\", QT_VERSION_STR); return 0; }\n")
            .with_alt_headers(&["qt/QtCore/qglobal.h", "QtCore/qcoreapplication.h", "qt6/QtCore/qcoreapplication.h"]),
        LibraryProbe::new("sdl2", &["SDL2/SDL.h"], &["libSDL2"], unix_like())
            .with_code("#include <SDL2/SDL.h>\nint main() { printf(\"%d.%d.%d\", SDL_MAJOR_VERSION, SDL_MINOR_VERSION, SDL_PATCHLEVEL); return 0; }\n")
            .with_alt_headers(&["SDL.h"]),
        LibraryProbe::new("sdl2_ttf", &["SDL2/SDL_ttf.h"], &["libSDL2_ttf"], unix_like())
            .with_code("#include <SDL2/SDL_ttf.h>\nint main() { printf(\"%d.%d.%d\", SDL_TTF_MAJOR_VERSION, SDL_TTF_MINOR_VERSION, SDL_TTF_PATCHLEVEL); return 0; }\n")
            .with_alt_headers(&["SDL_ttf.h"]),
        LibraryProbe::new("x11", &["X11/Xlib.h"], &["libX11"], unix_like())
            .with_code("#include <X11/Xlib.h>\nint main() { XOpenDisplay(NULL); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("xext", &["X11/extensions/Xext.h"], &["libXext"], unix_like())
            .with_code("#include <X11/Xlib.h>\n#include <X11/extensions/Xext.h>\nint main() { XSetExtensionErrorHandler(NULL); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("xmu", &["X11/Xmu/Xmu.h"], &["libXmu"], unix_like())
            .with_code("#include <X11/Xmu/Xmu.h>\nint main() { XmuMakeAtom(\"test\"); printf(\"<found>\"); return 0; }\n")
            .excluding(&[TargetOs::Darwin]),
        LibraryProbe::new("xrandr", &["X11/extensions/Xrandr.h"], &["libXrandr", "libX11"], unix_like())
            .with_code("#include <X11/Xlib.h>\n#include <X11/extensions/Xrandr.h>\nint main() { Display *dpy = XOpenDisplay(NULL); Window root = RootWindow(dpy, 0); XRRScreenConfiguration *c = XRRGetScreenInfo(dpy, root); printf(\"<found>\"); return 0; }\n"),
        LibraryProbe::new("libxinerama", &["X11/extensions/Xinerama.h"], &["libXinerama", "libX11"], unix_like())
            .with_code("#include <X11/Xlib.h>\n#include <X11/extensions/Xinerama.h>\nint main() { Display *dpy = XOpenDisplay(NULL); XineramaIsActive(dpy); printf(\"<found>\"); return 0; }\n"),
    ];
    libs.sort_by(|a, b| a.name().cmp(b.name()));
    libs
}

/// Every known tool, in check order. Earlier tools record compilers and
/// paths later ones rely on.
pub fn tools() -> Vec<ToolProbe> {
    vec![
        ToolProbe::new("gcc", &["gcc"], TargetSet::only(&[TargetOs::Linux, TargetOs::Solaris]))
            .with_detector(GccDetector),
        ToolProbe::new("visualcpp", &[], TargetSet::only(&[TargetOs::Windows]))
            .with_detector(VisualCppDetector),
        ToolProbe::new("devtools", &[], TargetSet::Any).with_detector(DevToolsDetector),
        ToolProbe::new("gsoap", &[], TargetSet::Any).with_detector(GsoapDetector),
        ToolProbe::new("java", &["java"], TargetSet::Any),
        ToolProbe::new("kbuild", &["kbuild"], TargetSet::Any).with_detector(KbuildDetector),
        ToolProbe::new("makeself", &["makeself"], TargetSet::only(&[TargetOs::Linux])),
        ToolProbe::new("openwatcom", &["wcl", "wcl386", "wlink"], TargetSet::Any)
            .with_detector(OpenWatcomDetector),
        ToolProbe::new("python_c_api", &[], TargetSet::Any).with_detector(PythonCApiDetector),
        ToolProbe::new("python_modules", &[], TargetSet::Any).with_detector(PythonModulesDetector),
        ToolProbe::new("xcode", &[], TargetSet::only(&[TargetOs::Darwin]))
            .with_detector(XcodeDetector::default()),
        ToolProbe::new("yasm", &["yasm"], TargetSet::Any),
    ]
}

/// Base tools every build on `os` needs, checked before anything else.
pub fn os_tools(os: TargetOs) -> &'static [&'static str] {
    match os {
        TargetOs::Linux => &["pkg-config", "gcc", "make"],
        TargetOs::Darwin => &["clang", "make", "brew"],
        TargetOs::Solaris => &["pkg-config", "cc", "gmake"],
        _ => &[],
    }
}
